// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! An in-memory [`DocumentStoreClient`] that understands the SQL this crate generates.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use azure_data_cosmos_mapping::{
    clients::DocumentStoreClient,
    constants::status,
    models::{ContainerProperties, Document},
    CreateContainerOptions, FeedPage, ItemOptions, PartitionKey, Query, QueryOptions, StoreError,
    StoreResult,
};
use serde_json::Value;

const BAD_REQUEST: u16 = 400;
const SERVICE_UNAVAILABLE: u16 = 503;

/// A query as received by the store.
#[derive(Clone, Debug)]
pub struct RecordedQuery {
    pub container: String,
    pub text: String,
    pub parameters: HashMap<String, Value>,
    pub options: QueryOptions,
}

#[derive(Default)]
struct MockContainer {
    properties: ContainerProperties,
    items: Vec<Document>,
}

impl MockContainer {
    fn partition_key_field(&self) -> Option<Vec<String>> {
        self.properties.partition_key_path().map(|path| {
            path.trim_start_matches('/')
                .split('/')
                .map(str::to_string)
                .collect()
        })
    }

    fn partition_value<'a>(&self, item: &'a Document) -> Option<&'a Value> {
        let field = self.partition_key_field()?;
        resolve(item, &field)
    }

    fn in_partition(&self, item: &Document, partition_key: Option<&PartitionKey>) -> bool {
        match partition_key {
            Some(pk) => self.partition_value(item) == Some(pk.value()),
            None => true,
        }
    }

    fn position(&self, id: &str, partition_key: Option<&PartitionKey>) -> Option<usize> {
        self.items.iter().position(|item| {
            item.get("id").and_then(Value::as_str) == Some(id) && self.in_partition(item, partition_key)
        })
    }
}

#[derive(Default)]
struct State {
    containers: HashMap<String, MockContainer>,
    queries: Vec<RecordedQuery>,
    container_creations: usize,
    etag_counter: u64,
    page_cap: Option<usize>,
    empty_pages: bool,
    failing_deletes: HashSet<String>,
}

impl State {
    fn container(&mut self, name: &str) -> StoreResult<&mut MockContainer> {
        self.containers
            .get_mut(name)
            .ok_or_else(|| StoreError::http(status::NOT_FOUND, format!("container '{}' not found", name)))
    }

    fn stamp(&mut self, item: &mut Document) {
        self.etag_counter += 1;
        item.insert("_etag".into(), Value::String(format!("\"{:08}\"", self.etag_counter)));
        item.insert("_ts".into(), Value::from(self.etag_counter));
    }
}

pub struct MockStore {
    state: Mutex<State>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Caps every query round-trip at `cap` items regardless of the requested page size.
    pub fn with_page_cap(self, cap: usize) -> Self {
        self.state.lock().unwrap().page_cap = Some(cap);
        self
    }

    /// Answers every continued query with an empty page first, carrying a fresh token that
    /// resumes where the previous page stopped.
    pub fn with_empty_pages(self) -> Self {
        self.state.lock().unwrap().empty_pages = true;
        self
    }

    /// Makes deleting the item with `id` fail with a 503.
    pub fn fail_delete_of(&self, id: &str) {
        self.state.lock().unwrap().failing_deletes.insert(id.to_string());
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn query_calls(&self) -> usize {
        self.state.lock().unwrap().queries.len()
    }

    pub fn container_creations(&self) -> usize {
        self.state.lock().unwrap().container_creations
    }

    pub fn item_count(&self, container: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(container)
            .map_or(0, |c| c.items.len())
    }

    pub fn raw_item(&self, container: &str, id: &str) -> Option<Document> {
        let state = self.state.lock().unwrap();
        let container = state.containers.get(container)?;
        container.position(id, None).map(|at| container.items[at].clone())
    }

    /// Changes a stored item behind the template's back, as another writer would.
    pub fn touch(&self, container: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        let mut item = {
            let container = state.containers.get_mut(container).unwrap();
            let at = container.position(id, None).unwrap();
            container.items.remove(at)
        };
        state.stamp(&mut item);
        state.containers.get_mut(container).unwrap().items.push(item);
    }
}

#[async_trait]
impl DocumentStoreClient for MockStore {
    async fn create_item(
        &self,
        container: &str,
        mut item: Document,
        _options: &ItemOptions,
    ) -> StoreResult<Document> {
        let mut state = self.state.lock().unwrap();
        let id = item_id(&item)?;
        {
            let container = state.container(container)?;
            let partition_key = container.partition_value(&item).cloned().and_then(PartitionKey::from_value);
            if container.position(&id, partition_key.as_ref()).is_some() {
                return Err(StoreError::http(status::CONFLICT, format!("item '{}' already exists", id)));
            }
        }
        state.stamp(&mut item);
        state.container(container)?.items.push(item.clone());
        Ok(item)
    }

    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: Option<&PartitionKey>,
        _options: &ItemOptions,
    ) -> StoreResult<Document> {
        let mut state = self.state.lock().unwrap();
        let container = state.container(container)?;
        container
            .position(id, partition_key)
            .map(|at| container.items[at].clone())
            .ok_or_else(|| StoreError::http(status::NOT_FOUND, format!("item '{}' not found", id)))
    }

    async fn upsert_item(
        &self,
        container: &str,
        mut item: Document,
        options: &ItemOptions,
    ) -> StoreResult<Document> {
        let mut state = self.state.lock().unwrap();
        let id = item_id(&item)?;
        let existing = {
            let container = state.container(container)?;
            let partition_key = container.partition_value(&item).cloned().and_then(PartitionKey::from_value);
            container.position(&id, partition_key.as_ref())
        };
        if let Some(expected) = &options.if_match {
            let current = existing.and_then(|at| {
                state.containers[container].items[at]
                    .get("_etag")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            if current.as_deref() != Some(expected.as_str()) {
                return Err(StoreError::http(
                    status::PRECONDITION_FAILED,
                    format!("item '{}' has changed", id),
                ));
            }
        }
        state.stamp(&mut item);
        let container = state.container(container)?;
        match existing {
            Some(at) => container.items[at] = item.clone(),
            None => container.items.push(item.clone()),
        }
        Ok(item)
    }

    async fn delete_item(
        &self,
        container: &str,
        id: &str,
        partition_key: Option<&PartitionKey>,
        options: &ItemOptions,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.contains(id) {
            return Err(StoreError::http(SERVICE_UNAVAILABLE, "service unavailable"));
        }
        let container = state.container(container)?;
        let at = container
            .position(id, partition_key)
            .ok_or_else(|| StoreError::http(status::NOT_FOUND, format!("item '{}' not found", id)))?;
        if let Some(expected) = &options.if_match {
            if container.items[at].get("_etag").and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(StoreError::http(
                    status::PRECONDITION_FAILED,
                    format!("item '{}' has changed", id),
                ));
            }
        }
        container.items.remove(at);
        Ok(())
    }

    async fn query_items(
        &self,
        container: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> StoreResult<FeedPage<Value>> {
        let mut state = self.state.lock().unwrap();
        let parameters: HashMap<String, Value> = query
            .parameters()
            .iter()
            .map(|p| (p.name().to_string(), p.value().clone()))
            .collect();
        state.queries.push(RecordedQuery {
            container: container.to_string(),
            text: query.text().to_string(),
            parameters: parameters.clone(),
            options: options.clone(),
        });
        let page_cap = state.page_cap;
        let empty_pages = state.empty_pages;

        let container = state.container(container)?;
        if container.partition_key_field().is_some()
            && !options.enable_cross_partition
            && options.partition_key.is_none()
        {
            return Err(StoreError::http(
                BAD_REQUEST,
                "cross partition query is required but disabled",
            ));
        }

        let parsed = Statement::parse(query.text())?;
        let mut matches = Vec::new();
        for item in &container.items {
            if !container.in_partition(item, options.partition_key.as_ref()) {
                continue;
            }
            let keep = match &parsed.filter {
                Some(filter) => filter.matches(item, &parameters)?,
                None => true,
            };
            if keep {
                matches.push(item);
            }
        }

        if parsed.count {
            // One partial count per partition, as a fanned-out aggregate returns them.
            let mut partials: BTreeMap<String, u64> = BTreeMap::new();
            for item in &matches {
                let key = container
                    .partition_value(item)
                    .map(Value::to_string)
                    .unwrap_or_default();
                *partials.entry(key).or_default() += 1;
            }
            let counts = if partials.is_empty() {
                vec![Value::from(0)]
            } else {
                partials.into_values().map(Value::from).collect()
            };
            return Ok(FeedPage::new(counts, None));
        }

        for (field, descending) in parsed.order_by.iter().rev() {
            matches.sort_by(|a, b| {
                let ordering = compare_values(resolve(a, field), resolve(b, field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        // Tokens issued after an injected empty page are prefixed with '~'.
        let (offset, resumed) = match &options.continuation {
            Some(token) => {
                let (digits, resumed) = match token.strip_prefix('~') {
                    Some(digits) => (digits, true),
                    None => (token.as_str(), false),
                };
                let offset = digits.parse::<usize>().map_err(|_| {
                    StoreError::http(BAD_REQUEST, format!("malformed continuation '{}'", token))
                })?;
                (offset, resumed)
            }
            None => (0, true),
        };
        if empty_pages && !resumed {
            return Ok(FeedPage::new(Vec::new(), Some(format!("~{}", offset))));
        }
        let mut limit = options.max_item_count.unwrap_or(usize::MAX);
        if let Some(cap) = page_cap {
            limit = limit.min(cap);
        }
        let end = offset.saturating_add(limit).min(matches.len());
        let items = matches
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|item| Value::Object((*item).clone()))
            .collect();
        let continuation = (end < matches.len()).then(|| end.to_string());
        Ok(FeedPage::new(items, continuation))
    }

    async fn create_container_if_not_exists(
        &self,
        properties: &ContainerProperties,
        _options: &CreateContainerOptions,
    ) -> StoreResult<ContainerProperties> {
        let mut state = self.state.lock().unwrap();
        state.container_creations += 1;
        let container = state
            .containers
            .entry(properties.id.clone())
            .or_insert_with(|| MockContainer {
                properties: properties.clone(),
                items: Vec::new(),
            });
        Ok(container.properties.clone())
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .containers
            .remove(container)
            .map(|_| ())
            .ok_or_else(|| StoreError::http(status::NOT_FOUND, format!("container '{}' not found", container)))
    }
}

fn item_id(item: &Document) -> StoreResult<String> {
    item.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::http(BAD_REQUEST, "item has no id"))
}

fn resolve<'a>(item: &'a Document, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = item.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn bad_query(message: impl Into<String>) -> StoreError {
    StoreError::http(BAD_REQUEST, message)
}

/// The parts of a generated statement the mock evaluates.
struct Statement {
    count: bool,
    filter: Option<Expr>,
    order_by: Vec<(Vec<String>, bool)>,
}

impl Statement {
    fn parse(text: &str) -> StoreResult<Self> {
        let (count, rest) = if let Some(rest) = text.strip_prefix("SELECT VALUE COUNT(1) FROM r") {
            (true, rest)
        } else if let Some(rest) = text.strip_prefix("SELECT * FROM ROOT r") {
            (false, rest)
        } else {
            return Err(bad_query(format!("unsupported statement: {}", text)));
        };

        let (rest, order_by) = match rest.split_once(" ORDER BY ") {
            Some((rest, order_by)) => (rest, parse_order_by(order_by)?),
            None => (rest, Vec::new()),
        };

        let filter = match rest.strip_prefix(" WHERE ") {
            Some(predicate) => {
                let tokens = tokenize(predicate)?;
                let mut parser = Parser { tokens, at: 0 };
                let expr = parser.or()?;
                if parser.at != parser.tokens.len() {
                    return Err(bad_query(format!("trailing input in: {}", predicate)));
                }
                Some(expr)
            }
            None if rest.is_empty() => None,
            None => return Err(bad_query(format!("unexpected clause: {}", rest))),
        };

        Ok(Self {
            count,
            filter,
            order_by,
        })
    }
}

fn parse_order_by(text: &str) -> StoreResult<Vec<(Vec<String>, bool)>> {
    text.split(", ")
        .map(|order| {
            let (field, direction) = order
                .rsplit_once(' ')
                .ok_or_else(|| bad_query(format!("bad ORDER BY item: {}", order)))?;
            match tokenize(field)?.as_slice() {
                [Token::Field(path)] => Ok((path.clone(), direction == "DESC")),
                _ => Err(bad_query(format!("bad ORDER BY field: {}", field))),
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Op(&'static str),
    Word(String),
    Field(Vec<String>),
    Param(String),
    Str(String),
}

fn tokenize(text: &str) -> StoreResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '<' | '>' | '!' => {
                let op = match (c, chars.get(i + 1)) {
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('!', Some('=')) => "!=",
                    ('<', _) => "<",
                    ('>', _) => ">",
                    _ => return Err(bad_query(format!("unexpected '{}'", c))),
                };
                i += op.len();
                tokens.push(Token::Op(op));
            }
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '"')
                    .ok_or_else(|| bad_query("unterminated string"))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '@' => {
                let len = chars[i + 1..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || **c == '_')
                    .count();
                tokens.push(Token::Param(chars[i..i + 1 + len].iter().collect()));
                i += len + 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || **c == '_')
                    .count();
                let word: String = chars[i..i + len].iter().collect();
                i += len;
                if word == "r" {
                    let mut path = Vec::new();
                    loop {
                        match chars.get(i) {
                            Some('.') => {
                                let len = chars[i + 1..]
                                    .iter()
                                    .take_while(|c| c.is_alphanumeric() || **c == '_')
                                    .count();
                                path.push(chars[i + 1..i + 1 + len].iter().collect());
                                i += len + 1;
                            }
                            Some('[') => {
                                let end = chars[i..]
                                    .iter()
                                    .position(|&c| c == ']')
                                    .ok_or_else(|| bad_query("unterminated property"))?;
                                let quoted: String = chars[i + 1..i + end].iter().collect();
                                let segment: String = serde_json::from_str(&quoted)
                                    .map_err(|_| bad_query(format!("bad property {}", quoted)))?;
                                path.push(segment);
                                i += end + 1;
                            }
                            _ => break,
                        }
                    }
                    tokens.push(Token::Field(path));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            c => return Err(bad_query(format!("unexpected '{}'", c))),
        }
    }
    Ok(tokens)
}

#[derive(Debug)]
enum Operand {
    Field(Vec<String>),
    Param(String),
    Literal(Value),
}

#[derive(Debug)]
enum Expr {
    Literal(bool),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Operand, &'static str, Operand),
    In(Operand, Vec<Operand>),
    Call(String, Vec<Operand>),
}

struct Parser {
    tokens: Vec<Token>,
    at: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> StoreResult<Token> {
        let token = self
            .tokens
            .get(self.at)
            .cloned()
            .ok_or_else(|| bad_query("unexpected end of query"))?;
        self.at += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> StoreResult<()> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(bad_query(format!("expected {:?}, got {:?}", expected, token)))
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == word) {
            self.at += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> StoreResult<Expr> {
        let mut left = self.and()?;
        while self.eat_word("OR") {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> StoreResult<Expr> {
        let mut left = self.not()?;
        while self.eat_word("AND") {
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> StoreResult<Expr> {
        if self.eat_word("NOT") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> StoreResult<Expr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.at += 1;
                let expr = self.or()?;
                self.expect(Token::RParen)?;
                return Ok(expr);
            }
            Some(Token::Word(w)) if w == "true" => {
                self.at += 1;
                return Ok(Expr::Literal(true));
            }
            Some(Token::Word(w)) if matches!(self.tokens.get(self.at + 1), Some(Token::LParen)) => {
                let name = w.clone();
                self.at += 2;
                let mut args = vec![self.operand()?];
                while self.peek() == Some(&Token::Comma) {
                    self.at += 1;
                    args.push(self.operand()?);
                }
                self.expect(Token::RParen)?;
                return Ok(Expr::Call(name, args));
            }
            _ => {}
        }

        let left = self.operand()?;
        if self.eat_word("IN") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.operand()?];
            while self.peek() == Some(&Token::Comma) {
                self.at += 1;
                values.push(self.operand()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Expr::In(left, values));
        }
        match self.next()? {
            Token::Op(op) => Ok(Expr::Compare(left, op, self.operand()?)),
            other => Err(bad_query(format!("expected an operator, got {:?}", other))),
        }
    }

    fn operand(&mut self) -> StoreResult<Operand> {
        match self.next()? {
            Token::Field(path) => Ok(Operand::Field(path)),
            Token::Param(name) => Ok(Operand::Param(name)),
            Token::Str(s) => Ok(Operand::Literal(Value::String(s))),
            Token::Word(w) if w == "true" => Ok(Operand::Literal(Value::Bool(true))),
            other => Err(bad_query(format!("expected an operand, got {:?}", other))),
        }
    }
}

impl Operand {
    fn eval<'a>(
        &'a self,
        item: &'a Document,
        parameters: &'a HashMap<String, Value>,
    ) -> StoreResult<Option<&'a Value>> {
        match self {
            Operand::Field(path) => Ok(resolve(item, path)),
            Operand::Param(name) => parameters
                .get(name)
                .map(Some)
                .ok_or_else(|| bad_query(format!("parameter {} is not bound", name))),
            Operand::Literal(value) => Ok(Some(value)),
        }
    }
}

impl Expr {
    fn matches(&self, item: &Document, parameters: &HashMap<String, Value>) -> StoreResult<bool> {
        Ok(match self {
            Expr::Literal(b) => *b,
            Expr::And(l, r) => l.matches(item, parameters)? && r.matches(item, parameters)?,
            Expr::Or(l, r) => l.matches(item, parameters)? || r.matches(item, parameters)?,
            Expr::Not(e) => !e.matches(item, parameters)?,
            Expr::Compare(l, op, r) => {
                let (Some(l), Some(r)) = (l.eval(item, parameters)?, r.eval(item, parameters)?) else {
                    return Ok(false);
                };
                let comparable = matches!(
                    (l, r),
                    (Value::Number(_), Value::Number(_))
                        | (Value::String(_), Value::String(_))
                        | (Value::Bool(_), Value::Bool(_))
                        | (Value::Null, Value::Null)
                );
                if !comparable {
                    return Ok(*op == "!=");
                }
                let ordering = compare_values(Some(l), Some(r));
                match *op {
                    "=" => ordering == Ordering::Equal,
                    "!=" => ordering != Ordering::Equal,
                    "<" => ordering == Ordering::Less,
                    "<=" => ordering != Ordering::Greater,
                    ">" => ordering == Ordering::Greater,
                    ">=" => ordering != Ordering::Less,
                    other => return Err(bad_query(format!("unsupported operator {}", other))),
                }
            }
            Expr::In(l, values) => {
                let Some(l) = l.eval(item, parameters)? else {
                    return Ok(false);
                };
                let mut found = false;
                for value in values {
                    found |= value.eval(item, parameters)? == Some(l);
                }
                found
            }
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(item, parameters))
                    .collect::<StoreResult<Vec<_>>>()?;
                let ignore_case = matches!(values.get(2), Some(Some(Value::Bool(true))));
                let strings = || -> Option<(String, String)> {
                    let (a, b) = (values.first()?.as_ref()?.as_str()?, values.get(1)?.as_ref()?.as_str()?);
                    Some(if ignore_case {
                        (a.to_lowercase(), b.to_lowercase())
                    } else {
                        (a.to_string(), b.to_string())
                    })
                };
                match name.as_str() {
                    "IS_DEFINED" => values.first().is_some_and(Option::is_some),
                    "IS_NULL" => matches!(values.first(), Some(Some(Value::Null))),
                    "CONTAINS" => strings().is_some_and(|(a, b)| a.contains(&b)),
                    "STARTSWITH" => strings().is_some_and(|(a, b)| a.starts_with(&b)),
                    "ENDSWITH" => strings().is_some_and(|(a, b)| a.ends_with(&b)),
                    other => return Err(bad_query(format!("unsupported function {}", other))),
                }
            }
        })
    }
}
