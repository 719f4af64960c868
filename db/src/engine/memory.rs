//! In-memory engine backend.
//!
//! This is the built-in [`Engine`](super::Engine) implementation: a
//! registry-based store mapping opaque handle ids to connection and
//! compiled-statement state behind one mutex. Each connection gets a
//! private table store; the path passed to `connect` is only a label.
//!
//! The supported SQL subset is exactly what the wrapper's contract
//! exercises: `CREATE TABLE`, `DROP TABLE`, `INSERT` with literal,
//! positional (`?`) and named (`:name`) values, and plain `SELECT`.
//! Effects run on the first step (reporting DONE); `SELECT` materializes
//! its rows on the first step and yields one ROW per step until DONE.
//! Column reads coerce the way embedded engines do: numbers render as
//! text, text parses as numbers where possible, and null reads as
//! `0` / `0.0` / the empty string.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;

use super::{ConnectionHandle, Engine, EngineError, StatementHandle, StepOutcome, Value};

/// Generic statement-level failure.
const CODE_ERROR: i32 = 1;
/// Disconnect refused: compiled statements on the connection are still open.
const CODE_BUSY: i32 = 5;

pub struct MemoryEngine {
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    next_id: u64,
    connections: HashMap<u64, Connection>,
    statements: HashMap<u64, CompiledStatement>,
}

#[derive(Default)]
struct Connection {
    tables: HashMap<String, Table>,
    last_insert_row_id: i64,
}

struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    next_row_id: i64,
}

struct CompiledStatement {
    conn: u64,
    plan: Plan,
    /// Parameter name (including the leading `:`) to 1-based slot.
    param_names: HashMap<String, usize>,
    /// 1-based slot `i` lives at `bindings[i - 1]`; unbound slots read null.
    bindings: Vec<Value>,
    cursor: Cursor,
}

#[derive(Clone, Debug)]
enum Plan {
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    DropTable {
        table: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Expr>,
    },
    Select {
        table: String,
        columns: SelectColumns,
    },
}

#[derive(Clone, Debug)]
enum SelectColumns {
    All,
    Named(Vec<String>),
}

#[derive(Clone, Debug)]
enum Expr {
    Literal(Value),
    Param(usize),
}

enum Cursor {
    /// Compiled (or reset) but not yet stepped.
    Unstarted,
    /// A select mid-iteration; `current` is the row reads see.
    Rows {
        rows: Vec<Vec<Value>>,
        next: usize,
        current: Option<Vec<Value>>,
    },
    /// A one-shot statement whose effect already ran.
    Done,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_connection() -> EngineError {
    EngineError::failure(CODE_ERROR, "invalid connection handle")
}

fn invalid_statement() -> EngineError {
    EngineError::failure(CODE_ERROR, "invalid statement handle")
}

fn no_such_table(table: &str) -> EngineError {
    EngineError::failure(CODE_ERROR, format!("no such table: {table}"))
}

fn advance(rows: &[Vec<Value>], next: &mut usize, current: &mut Option<Vec<Value>>) -> StepOutcome {
    if *next < rows.len() {
        *current = Some(rows[*next].clone());
        *next += 1;
        StepOutcome::Row
    } else {
        *current = None;
        StepOutcome::Done
    }
}

fn eval(expr: &Expr, bindings: &[Value]) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Param(slot) => bindings.get(slot - 1).cloned().unwrap_or(Value::Null),
    }
}

fn value_to_int(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        Value::Real(f) => *f as i64,
        Value::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Null => 0,
    }
}

fn value_to_double(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Null => 0.0,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Null => String::new(),
    }
}

impl Engine for MemoryEngine {
    fn connect(&self, _path: &Path) -> Result<ConnectionHandle, EngineError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.connections.insert(id, Connection::default());
        Ok(ConnectionHandle(id))
    }

    fn disconnect(&self, conn: ConnectionHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !state.connections.contains_key(&conn.0) {
            return Err(invalid_connection());
        }
        let open_statements = state.statements.values().filter(|s| s.conn == conn.0).count();
        if open_statements > 0 {
            return Err(EngineError::failure(
                CODE_BUSY,
                format!("unable to close connection: {open_statements} statement(s) still open"),
            ));
        }
        state.connections.remove(&conn.0);
        Ok(())
    }

    fn compile(&self, conn: ConnectionHandle, sql: &str) -> Result<StatementHandle, EngineError> {
        let mut state = self.state.lock();
        let connection = state.connections.get(&conn.0).ok_or_else(invalid_connection)?;

        let parsed = parser::parse(sql)?;
        let parsed = validate(parsed, connection)?;

        state.next_id += 1;
        let id = state.next_id;
        let bindings = vec![Value::Null; parsed.param_count];
        state.statements.insert(
            id,
            CompiledStatement {
                conn: conn.0,
                plan: parsed.plan,
                param_names: parsed.param_names,
                bindings,
                cursor: Cursor::Unstarted,
            },
        );
        Ok(StatementHandle(id))
    }

    fn finalize(&self, stmt: StatementHandle) -> Result<(), EngineError> {
        // Tolerates unknown handles so finalize stays idempotent end to end.
        self.state.lock().statements.remove(&stmt.0);
        Ok(())
    }

    fn bind_int(
        &self,
        stmt: StatementHandle,
        index: usize,
        value: i64,
    ) -> Result<(), EngineError> {
        self.bind(stmt, index, Value::Integer(value))
    }

    fn bind_double(
        &self,
        stmt: StatementHandle,
        index: usize,
        value: f64,
    ) -> Result<(), EngineError> {
        self.bind(stmt, index, Value::Real(value))
    }

    fn bind_text(
        &self,
        stmt: StatementHandle,
        index: usize,
        value: &str,
    ) -> Result<(), EngineError> {
        self.bind(stmt, index, Value::Text(value.to_string()))
    }

    fn bind_null(&self, stmt: StatementHandle, index: usize) -> Result<(), EngineError> {
        self.bind(stmt, index, Value::Null)
    }

    fn parameter_index(
        &self,
        stmt: StatementHandle,
        name: &str,
    ) -> Result<Option<usize>, EngineError> {
        let state = self.state.lock();
        let entry = state.statements.get(&stmt.0).ok_or_else(invalid_statement)?;
        Ok(entry.param_names.get(name).copied())
    }

    fn step(&self, stmt: StatementHandle) -> Result<StepOutcome, EngineError> {
        let mut guard = self.state.lock();
        let EngineState {
            connections,
            statements,
            ..
        } = &mut *guard;
        let entry = statements.get_mut(&stmt.0).ok_or_else(invalid_statement)?;

        if let Cursor::Rows {
            rows,
            next,
            current,
        } = &mut entry.cursor
        {
            return Ok(advance(rows, next, current));
        }
        if matches!(entry.cursor, Cursor::Done) {
            return Ok(StepOutcome::Done);
        }

        let connection = connections.get_mut(&entry.conn).ok_or_else(invalid_connection)?;
        match &entry.plan {
            Plan::CreateTable { table, columns } => {
                if connection.tables.contains_key(table) {
                    return Err(EngineError::failure(
                        CODE_ERROR,
                        format!("table {table} already exists"),
                    ));
                }
                connection.tables.insert(
                    table.clone(),
                    Table {
                        columns: columns.clone(),
                        rows: Vec::new(),
                        next_row_id: 0,
                    },
                );
                entry.cursor = Cursor::Done;
                Ok(StepOutcome::Done)
            }
            Plan::DropTable { table } => {
                if connection.tables.remove(table).is_none() {
                    return Err(no_such_table(table));
                }
                entry.cursor = Cursor::Done;
                Ok(StepOutcome::Done)
            }
            Plan::Insert {
                table,
                columns,
                values,
            } => {
                let target = connection
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| no_such_table(table))?;
                let mut row = vec![Value::Null; target.columns.len()];
                for (column, expr) in columns.iter().zip(values) {
                    let position =
                        target.columns.iter().position(|c| c == column).ok_or_else(|| {
                            EngineError::failure(
                                CODE_ERROR,
                                format!("table {table} has no column named {column}"),
                            )
                        })?;
                    row[position] = eval(expr, &entry.bindings);
                }
                target.next_row_id += 1;
                let row_id = target.next_row_id;
                target.rows.push(row);
                connection.last_insert_row_id = row_id;
                entry.cursor = Cursor::Done;
                Ok(StepOutcome::Done)
            }
            Plan::Select { table, columns } => {
                let source = connection
                    .tables
                    .get(table)
                    .ok_or_else(|| no_such_table(table))?;
                let projection: Vec<usize> = match columns {
                    SelectColumns::All => (0..source.columns.len()).collect(),
                    SelectColumns::Named(names) => names
                        .iter()
                        .map(|name| {
                            source.columns.iter().position(|c| c == name).ok_or_else(|| {
                                EngineError::failure(
                                    CODE_ERROR,
                                    format!("no such column: {name}"),
                                )
                            })
                        })
                        .collect::<Result<_, _>>()?,
                };
                let rows: Vec<Vec<Value>> = source
                    .rows
                    .iter()
                    .map(|row| projection.iter().map(|&i| row[i].clone()).collect())
                    .collect();
                let mut next = 0;
                let mut current = None;
                let outcome = advance(&rows, &mut next, &mut current);
                entry.cursor = Cursor::Rows {
                    rows,
                    next,
                    current,
                };
                Ok(outcome)
            }
        }
    }

    fn reset(&self, stmt: StatementHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let entry = state.statements.get_mut(&stmt.0).ok_or_else(invalid_statement)?;
        // Bindings survive a reset; only the execution position rewinds.
        entry.cursor = Cursor::Unstarted;
        Ok(())
    }

    fn column_count(&self, stmt: StatementHandle) -> Result<usize, EngineError> {
        let state = self.state.lock();
        let entry = state.statements.get(&stmt.0).ok_or_else(invalid_statement)?;
        Ok(match &entry.cursor {
            Cursor::Rows {
                current: Some(row), ..
            } => row.len(),
            _ => 0,
        })
    }

    fn column_int(&self, stmt: StatementHandle, column: usize) -> Result<i64, EngineError> {
        self.read_column(stmt, column, value_to_int, 0)
    }

    fn column_double(&self, stmt: StatementHandle, column: usize) -> Result<f64, EngineError> {
        self.read_column(stmt, column, value_to_double, 0.0)
    }

    fn column_text(&self, stmt: StatementHandle, column: usize) -> Result<String, EngineError> {
        self.read_column(stmt, column, value_to_text, String::new())
    }

    fn last_insert_row_id(&self, conn: ConnectionHandle) -> Result<i64, EngineError> {
        let state = self.state.lock();
        let connection = state.connections.get(&conn.0).ok_or_else(invalid_connection)?;
        Ok(connection.last_insert_row_id)
    }
}

impl MemoryEngine {
    fn bind(&self, stmt: StatementHandle, index: usize, value: Value) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let entry = state.statements.get_mut(&stmt.0).ok_or_else(invalid_statement)?;
        if index == 0 || index > entry.bindings.len() {
            return Err(EngineError::Range);
        }
        entry.bindings[index - 1] = value;
        Ok(())
    }

    /// Out-of-range columns and missing rows read as the type's default,
    /// matching the permissive behavior of the column accessors in
    /// embedded engines. The wrapper's read guards keep callers from
    /// relying on this.
    fn read_column<T>(
        &self,
        stmt: StatementHandle,
        column: usize,
        convert: impl Fn(&Value) -> T,
        default: T,
    ) -> Result<T, EngineError> {
        let state = self.state.lock();
        let entry = state.statements.get(&stmt.0).ok_or_else(invalid_statement)?;
        Ok(match &entry.cursor {
            Cursor::Rows {
                current: Some(row), ..
            } => row.get(column).map(&convert).unwrap_or(default),
            _ => default,
        })
    }
}

/// Early (compile-time) validation against the connection's schema, so
/// callers see "no such table" and friends from `prepare` rather than from
/// the first step. CREATE and DROP are deliberately left to step time; the
/// schema they touch may legitimately change between compile and step.
struct Validated {
    plan: Plan,
    param_count: usize,
    param_names: HashMap<String, usize>,
}

fn validate(parsed: parser::Parsed, connection: &Connection) -> Result<Validated, EngineError> {
    let plan = match parsed.plan {
        Plan::Insert {
            table,
            columns,
            values,
        } => {
            let target = connection.tables.get(&table).ok_or_else(|| no_such_table(&table))?;
            // An omitted column list means "all columns, in table order".
            let columns = if columns.is_empty() {
                target.columns.clone()
            } else {
                for column in &columns {
                    if !target.columns.contains(column) {
                        return Err(EngineError::failure(
                            CODE_ERROR,
                            format!("table {table} has no column named {column}"),
                        ));
                    }
                }
                columns
            };
            if columns.len() != values.len() {
                return Err(EngineError::failure(
                    CODE_ERROR,
                    format!(
                        "{} values for {} columns",
                        values.len(),
                        columns.len()
                    ),
                ));
            }
            Plan::Insert {
                table,
                columns,
                values,
            }
        }
        Plan::Select { table, columns } => {
            let source = connection.tables.get(&table).ok_or_else(|| no_such_table(&table))?;
            if let SelectColumns::Named(names) = &columns {
                for name in names {
                    if !source.columns.contains(name) {
                        return Err(EngineError::failure(
                            CODE_ERROR,
                            format!("no such column: {name}"),
                        ));
                    }
                }
            }
            Plan::Select { table, columns }
        }
        other => other,
    };
    Ok(Validated {
        plan,
        param_count: parsed.param_count,
        param_names: parsed.param_names,
    })
}

mod parser {
    //! Hand tokenizer and recursive-descent parser for the SQL subset.

    use std::collections::HashMap;

    use super::{CODE_ERROR, EngineError, Expr, Plan, SelectColumns};
    use crate::engine::Value;

    pub(super) struct Parsed {
        pub plan: Plan,
        pub param_count: usize,
        pub param_names: HashMap<String, usize>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Token {
        Ident(String),
        Number(String),
        Str(String),
        Positional,
        Named(String),
        Punct(char),
    }

    fn syntax_error(detail: impl std::fmt::Display) -> EngineError {
        EngineError::failure(CODE_ERROR, format!("syntax error: {detail}"))
    }

    fn tokenize(sql: &str) -> Result<Vec<Token>, EngineError> {
        let mut tokens = Vec::new();
        let mut chars = sql.chars().peekable();
        while let Some(&c) = chars.peek() {
            match c {
                _ if c.is_whitespace() => {
                    chars.next();
                }
                '(' | ')' | ',' | '*' | ';' | '-' => {
                    chars.next();
                    tokens.push(Token::Punct(c));
                }
                '?' => {
                    chars.next();
                    tokens.push(Token::Positional);
                }
                ':' => {
                    chars.next();
                    let name = take_ident(&mut chars);
                    if name.is_empty() {
                        return Err(syntax_error("':' without a parameter name"));
                    }
                    tokens.push(Token::Named(name));
                }
                '\'' => {
                    chars.next();
                    let mut text = String::new();
                    loop {
                        match chars.next() {
                            Some('\'') => {
                                // Doubled quote is an escaped quote.
                                if chars.peek() == Some(&'\'') {
                                    chars.next();
                                    text.push('\'');
                                } else {
                                    break;
                                }
                            }
                            Some(other) => text.push(other),
                            None => return Err(syntax_error("unterminated string literal")),
                        }
                    }
                    tokens.push(Token::Str(text));
                }
                _ if c.is_ascii_digit() || c == '.' => {
                    let mut number = String::new();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() || d == '.' {
                            number.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Number(number));
                }
                _ if c.is_alphabetic() || c == '_' => {
                    let ident = take_ident(&mut chars);
                    tokens.push(Token::Ident(ident));
                }
                other => return Err(syntax_error(format!("unrecognized token '{other}'"))),
            }
        }
        Ok(tokens)
    }

    fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
        let mut ident = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                chars.next();
            } else {
                break;
            }
        }
        ident
    }

    struct Params {
        count: usize,
        names: HashMap<String, usize>,
    }

    impl Params {
        fn positional(&mut self) -> usize {
            self.count += 1;
            self.count
        }

        // Repeated uses of one name share a slot, which still counts once.
        fn named(&mut self, name: &str) -> usize {
            if let Some(&slot) = self.names.get(name) {
                return slot;
            }
            self.count += 1;
            self.names.insert(name.to_string(), self.count);
            self.count
        }
    }

    struct Parser {
        tokens: Vec<Token>,
        pos: usize,
        params: Params,
    }

    impl Parser {
        fn peek(&self) -> Option<&Token> {
            self.tokens.get(self.pos)
        }

        // Owned tokens keep the borrow checker out of the parameter
        // allocator's way in `expr`.
        fn next(&mut self) -> Option<Token> {
            let token = self.tokens.get(self.pos).cloned();
            if token.is_some() {
                self.pos += 1;
            }
            token
        }

        fn keyword(&mut self, expected: &str) -> Result<(), EngineError> {
            match self.next() {
                Some(Token::Ident(word)) if word.eq_ignore_ascii_case(expected) => Ok(()),
                other => Err(syntax_error(format!("expected {expected}, got {other:?}"))),
            }
        }

        fn ident(&mut self) -> Result<String, EngineError> {
            match self.next() {
                Some(Token::Ident(word)) => Ok(word),
                other => Err(syntax_error(format!("expected identifier, got {other:?}"))),
            }
        }

        fn punct(&mut self, expected: char) -> Result<(), EngineError> {
            match self.next() {
                Some(Token::Punct(c)) if c == expected => Ok(()),
                other => Err(syntax_error(format!("expected '{expected}', got {other:?}"))),
            }
        }

        fn eat_punct(&mut self, expected: char) -> bool {
            if matches!(self.peek(), Some(Token::Punct(c)) if *c == expected) {
                self.pos += 1;
                true
            } else {
                false
            }
        }

        fn ident_list(&mut self) -> Result<Vec<String>, EngineError> {
            let mut items = vec![self.ident()?];
            while self.eat_punct(',') {
                items.push(self.ident()?);
            }
            Ok(items)
        }

        fn expr(&mut self) -> Result<Expr, EngineError> {
            let negate = self.eat_punct('-');
            match self.next() {
                Some(Token::Positional) if !negate => Ok(Expr::Param(self.params.positional())),
                Some(Token::Named(name)) if !negate => {
                    let key = format!(":{name}");
                    Ok(Expr::Param(self.params.named(&key)))
                }
                Some(Token::Str(text)) if !negate => Ok(Expr::Literal(Value::Text(text))),
                Some(Token::Number(number)) => {
                    let literal = parse_number(&number, negate)?;
                    Ok(Expr::Literal(literal))
                }
                Some(Token::Ident(word)) if !negate && word.eq_ignore_ascii_case("null") => {
                    Ok(Expr::Literal(Value::Null))
                }
                other => Err(syntax_error(format!("expected value, got {other:?}"))),
            }
        }

        fn end(&mut self) -> Result<(), EngineError> {
            self.eat_punct(';');
            match self.peek() {
                None => Ok(()),
                Some(token) => Err(syntax_error(format!("trailing input at {token:?}"))),
            }
        }
    }

    fn parse_number(text: &str, negate: bool) -> Result<Value, EngineError> {
        if text.contains('.') {
            let value: f64 = text
                .parse()
                .map_err(|_| syntax_error(format!("bad numeric literal '{text}'")))?;
            Ok(Value::Real(if negate { -value } else { value }))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| syntax_error(format!("bad numeric literal '{text}'")))?;
            Ok(Value::Integer(if negate { -value } else { value }))
        }
    }

    pub(super) fn parse(sql: &str) -> Result<Parsed, EngineError> {
        let tokens = tokenize(sql)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            params: Params {
                count: 0,
                names: HashMap::new(),
            },
        };

        let head = parser.ident()?;
        let plan = if head.eq_ignore_ascii_case("create") {
            parser.keyword("table")?;
            let table = parser.ident()?;
            parser.punct('(')?;
            let columns = parser.ident_list()?;
            parser.punct(')')?;
            Plan::CreateTable { table, columns }
        } else if head.eq_ignore_ascii_case("drop") {
            parser.keyword("table")?;
            let table = parser.ident()?;
            Plan::DropTable { table }
        } else if head.eq_ignore_ascii_case("insert") {
            parser.keyword("into")?;
            let table = parser.ident()?;
            let columns = if parser.eat_punct('(') {
                let list = parser.ident_list()?;
                parser.punct(')')?;
                list
            } else {
                Vec::new()
            };
            parser.keyword("values")?;
            parser.punct('(')?;
            let mut values = vec![parser.expr()?];
            while parser.eat_punct(',') {
                values.push(parser.expr()?);
            }
            parser.punct(')')?;
            Plan::Insert {
                table,
                columns,
                values,
            }
        } else if head.eq_ignore_ascii_case("select") {
            let columns = if parser.eat_punct('*') {
                SelectColumns::All
            } else {
                SelectColumns::Named(parser.ident_list()?)
            };
            parser.keyword("from")?;
            let table = parser.ident()?;
            Plan::Select { table, columns }
        } else {
            return Err(EngineError::failure(
                CODE_ERROR,
                format!("unsupported statement: {head}"),
            ));
        };
        parser.end()?;

        Ok(Parsed {
            plan,
            param_count: parser.params.count,
            param_names: parser.params.names,
        })
    }
}
