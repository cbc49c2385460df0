//! Declaration-level GLSL front end.
//!
//! Checks what a driver would reject before type checking: lexical errors,
//! the `#version` line, global declarations and their types, interface
//! blocks, and bracket structure inside function bodies. Expressions are
//! not type checked.

use std::collections::{HashMap, HashSet};

use super::expr::{self, Term};
use super::lexer::{Diagnostic, Lexer, Token, TokenKind};
use super::preprocess::preprocess;
use super::types::GlslType;
use crate::gfx::{ShaderStage, UniformValue};

const SUPPORTED_VERSIONS: [u16; 17] = [
    100, 110, 120, 130, 140, 150, 300, 310, 320, 330, 400, 410, 420, 430, 440, 450, 460,
];

const AUXILIARY_QUALIFIERS: [&str; 12] = [
    "flat", "smooth", "noperspective", "centroid", "invariant", "sample", "patch", "precise",
    "lowp", "mediump", "highp", "readonly",
];

const PARAMETER_QUALIFIERS: [&str; 7] = ["in", "out", "inout", "const", "lowp", "mediump", "highp"];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Version {
    pub number: u16,
    pub es: bool,
}

/// A global `in`, `out` or `uniform` variable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Variable {
    pub name: String,
    pub ty: GlslType,
    pub array: Option<u32>,
    pub location: Option<u32>,
    pub line: u32,
    /// Named somewhere inside a function body.
    pub referenced: bool,
    /// Literal initializer of a scalar or vector uniform.
    pub initializer: Option<UniformValue>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Member {
    pub name: String,
    pub ty: GlslType,
    pub array: Option<u32>,
}

/// An `in`/`out`/`uniform` interface block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Block {
    pub name: String,
    pub instance: Option<String>,
    pub members: Vec<Member>,
    pub line: u32,
    pub referenced: bool,
}

/// Everything the linker needs from one compiled stage.
#[derive(Debug, Clone)]
pub(crate) struct StageInterface {
    pub stage: ShaderStage,
    pub version: Version,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
    pub uniforms: Vec<Variable>,
    pub in_blocks: Vec<Block>,
    pub out_blocks: Vec<Block>,
    pub uniform_blocks: Vec<Block>,
    /// Struct definitions by name.
    pub structs: HashMap<String, Vec<Member>>,
    pub has_main: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Storage {
    Plain,
    In,
    Out,
    Uniform,
    Const,
    Buffer,
}

/// Compiles one stage down to its interface.
pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<StageInterface, Diagnostic> {
    let source = preprocess(source)?;
    let tokens = Lexer::new(&source).tokenize()?;
    Parser::new(stage, tokens).parse()
}

struct Parser {
    stage: ShaderStage,
    tokens: Vec<Token>,
    pos: usize,

    version: Option<Version>,
    structs: HashMap<String, Vec<Member>>,
    /// Integral `const` globals with a known value.
    consts: HashMap<String, i64>,
    globals: HashSet<String>,
    referenced: HashSet<String>,
    has_main: bool,

    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    uniforms: Vec<Variable>,
    in_blocks: Vec<Block>,
    out_blocks: Vec<Block>,
    uniform_blocks: Vec<Block>,
}

impl Parser {
    fn new(stage: ShaderStage, tokens: Vec<Token>) -> Self {
        Self {
            stage,
            tokens,
            pos: 0,
            version: None,
            structs: HashMap::new(),
            consts: HashMap::new(),
            globals: HashSet::new(),
            referenced: HashSet::new(),
            has_main: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            uniforms: Vec::new(),
            in_blocks: Vec::new(),
            out_blocks: Vec::new(),
            uniform_blocks: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<StageInterface, Diagnostic> {
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::Eof => break,
                TokenKind::Directive(text) => {
                    self.bump();
                    self.directive(text, tok.line)?;
                }
                _ if self.version.is_none() => {
                    return Err(Diagnostic::new(tok.line, "#version directive required before declarations"));
                }
                TokenKind::Punct(';') => {
                    self.bump();
                }
                TokenKind::Ident(word) if word == "precision" => self.precision()?,
                TokenKind::Ident(word) if word == "struct" => self.struct_definition()?,
                TokenKind::Ident(_) => self.external_declaration()?,
                _ => return Err(unexpected(&tok)),
            }
        }

        let Some(version) = self.version else {
            let line = self.peek().line;
            return Err(Diagnostic::new(line, "#version directive required"));
        };

        let refs = &self.referenced;
        for var in self.inputs.iter_mut().chain(&mut self.outputs).chain(&mut self.uniforms) {
            var.referenced = refs.contains(&var.name);
        }
        for block in self
            .in_blocks
            .iter_mut()
            .chain(&mut self.out_blocks)
            .chain(&mut self.uniform_blocks)
        {
            block.referenced = match &block.instance {
                Some(instance) => refs.contains(instance),
                None => block.members.iter().any(|m| refs.contains(&m.name)),
            };
        }

        Ok(StageInterface {
            stage: self.stage,
            version,
            inputs: self.inputs,
            outputs: self.outputs,
            uniforms: self.uniforms,
            in_blocks: self.in_blocks,
            out_blocks: self.out_blocks,
            uniform_blocks: self.uniform_blocks,
            structs: self.structs,
            has_main: self.has_main,
        })
    }

    // ── token cursor ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek().kind == TokenKind::Punct(c)
    }

    fn peek_ident(&self) -> Option<&str> {
        match &self.peek().kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), Diagnostic> {
        let tok = self.bump();
        if tok.kind == TokenKind::Punct(c) {
            Ok(())
        } else {
            Err(unexpected(&tok))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, u32), Diagnostic> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Ident(name) => Ok((name, tok.line)),
            _ => Err(unexpected(&tok)),
        }
    }

    // ── directives ────────────────────────────────────────────────────────

    fn directive(&mut self, text: &str, line: u32) -> Result<(), Diagnostic> {
        let mut words = text.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(()); // null directive
        };

        if name == "version" {
            if self.version.is_some() {
                return Err(Diagnostic::new(line, "#version directive must occur only once"));
            }
            let version = parse_version(words.collect(), line)?;
            self.version = Some(version);
            return Ok(());
        }

        if self.version.is_none() {
            return Err(Diagnostic::new(line, "#version directive must occur before anything else"));
        }

        match name {
            "error" => Err(Diagnostic::new(line, format!("#error {}", words.collect::<Vec<_>>().join(" ")))),
            "extension" | "pragma" | "define" | "undef" | "if" | "ifdef" | "ifndef" | "else"
            | "elif" | "endif" | "line" => Ok(()),
            other => Err(Diagnostic::new(line, format!("invalid directive '#{other}'"))),
        }
    }

    // ── global declarations ───────────────────────────────────────────────

    fn precision(&mut self) -> Result<(), Diagnostic> {
        self.bump(); // `precision`
        let (qualifier, line) = self.expect_ident()?;
        if !matches!(qualifier.as_str(), "lowp" | "mediump" | "highp") {
            return Err(Diagnostic::new(line, format!("'{qualifier}' is not a precision qualifier")));
        }
        let (type_name, line) = self.expect_ident()?;
        self.resolve_type(&type_name, line)?;
        self.expect_punct(';')
    }

    fn struct_definition(&mut self) -> Result<(), Diagnostic> {
        self.bump(); // `struct`
        let (name, line) = self.expect_ident()?;
        if GlslType::builtin(&name).is_some() || self.structs.contains_key(&name) {
            return Err(Diagnostic::new(line, format!("'{name}' : redefinition")));
        }
        self.expect_punct('{')?;
        let members = self.members()?;
        self.structs.insert(name.clone(), members);

        if self.is_punct(';') {
            self.bump();
            return Ok(());
        }
        let (first, line) = self.expect_ident()?;
        self.declarators(Storage::Plain, GlslType::Struct(name), first, line, None)
    }

    fn external_declaration(&mut self) -> Result<(), Diagnostic> {
        let mut location = None;
        let mut storage = Storage::Plain;

        while let Some(word) = self.peek_ident() {
            let line = self.peek().line;
            if word == "layout" {
                location = self.layout()?.or(location);
                continue;
            }
            if AUXILIARY_QUALIFIERS.contains(&word) {
                self.bump();
                continue;
            }
            let next = match word {
                "in" => Storage::In,
                "out" => Storage::Out,
                "uniform" => Storage::Uniform,
                "const" => Storage::Const,
                "buffer" => Storage::Buffer,
                "attribute" if self.stage == ShaderStage::Vertex => Storage::In,
                "attribute" => {
                    return Err(Diagnostic::new(
                        line,
                        format!("'attribute' qualifier is not allowed in {} shaders", self.stage),
                    ));
                }
                "varying" => match self.stage {
                    ShaderStage::Vertex => Storage::Out,
                    ShaderStage::Fragment => Storage::In,
                },
                _ => break,
            };
            if storage != Storage::Plain {
                return Err(Diagnostic::new(line, "too many storage qualifiers"));
            }
            storage = next;
            self.bump();
        }

        let is_block = matches!(storage, Storage::In | Storage::Out | Storage::Uniform | Storage::Buffer)
            && matches!(self.peek().kind, TokenKind::Ident(_))
            && self.peek_nth(1).kind == TokenKind::Punct('{');
        if is_block {
            return self.interface_block(storage);
        }

        let type_tok = self.bump();
        let TokenKind::Ident(type_name) = &type_tok.kind else {
            return Err(unexpected(&type_tok));
        };
        if GlslType::builtin(type_name).is_none()
            && !self.structs.contains_key(type_name)
            && !matches!(self.peek().kind, TokenKind::Ident(_))
        {
            // `gl_Position = ...;` at global scope and the like.
            return Err(unexpected(self.peek()));
        }
        let ty = self.resolve_type(type_name, type_tok.line)?;

        let (name, line) = self.expect_ident()?;
        if self.is_punct('(') {
            if storage != Storage::Plain {
                return Err(Diagnostic::new(line, format!("'{name}' : storage qualifiers are not allowed on functions")));
            }
            return self.function(ty, name, line);
        }

        self.declarators(storage, ty, name, line, location)
    }

    /// Parses `layout(...)`, returning the `location` if one is given.
    fn layout(&mut self) -> Result<Option<u32>, Diagnostic> {
        self.bump(); // `layout`
        self.expect_punct('(')?;

        let mut location = None;
        loop {
            let (key, line) = self.expect_ident()?;
            if self.is_punct('=') {
                self.bump();
                let tok = self.bump();
                let value = match &tok.kind {
                    TokenKind::Number(text) => parse_uint(text),
                    _ => None,
                };
                let Some(value) = value else {
                    return Err(Diagnostic::new(tok.line, format!("layout qualifier '{key}' needs an integer value")));
                };
                if key == "location" {
                    location = Some(value);
                }
            } else if key == "location" {
                return Err(Diagnostic::new(line, "layout qualifier 'location' needs a value"));
            }

            let tok = self.bump();
            match tok.kind {
                TokenKind::Punct(',') => continue,
                TokenKind::Punct(')') => break,
                _ => return Err(unexpected(&tok)),
            }
        }
        Ok(location)
    }

    fn declarators(
        &mut self,
        storage: Storage,
        ty: GlslType,
        first: String,
        first_line: u32,
        mut location: Option<u32>,
    ) -> Result<(), Diagnostic> {
        let (mut name, mut line) = (first, first_line);
        loop {
            if ty == GlslType::Void {
                return Err(Diagnostic::new(line, format!("'{name}' : illegal use of type 'void'")));
            }
            let array = self.array_suffix()?;

            let mut initializer = None;
            if self.is_punct('=') {
                self.bump();
                initializer = Some(self.initializer()?);
            }
            let initialized = initializer.is_some();
            if storage == Storage::Const && !initialized {
                return Err(Diagnostic::new(
                    line,
                    format!("'{name}' : variables with qualifier 'const' must be initialized"),
                ));
            }
            if matches!(storage, Storage::In | Storage::Out) && initialized {
                return Err(Diagnostic::new(line, format!("'{name}' : shader inputs and outputs cannot be initialized")));
            }

            self.declare(&name, line)?;
            let tokens = initializer.unwrap_or_default();
            if storage == Storage::Const && array.is_none() && matches!(ty, GlslType::Int | GlslType::UInt) {
                if let Some(value) = self.constant(&tokens) {
                    self.consts.insert(name.clone(), value);
                }
            }
            let initializer = match (storage, array) {
                (Storage::Uniform, None) if !tokens.is_empty() => self.literal_value(&ty, &tokens),
                _ => None,
            };
            let var = Variable {
                name,
                ty: ty.clone(),
                array,
                location: location.take(),
                line,
                referenced: false,
                initializer,
            };
            match storage {
                Storage::In => self.inputs.push(var),
                Storage::Out => self.outputs.push(var),
                Storage::Uniform => self.uniforms.push(var),
                Storage::Plain | Storage::Const | Storage::Buffer => {}
            }

            let tok = self.bump();
            match tok.kind {
                TokenKind::Punct(',') => (name, line) = self.expect_ident()?,
                TokenKind::Punct(';') => return Ok(()),
                _ => return Err(unexpected(&tok)),
            }
        }
    }

    fn interface_block(&mut self, storage: Storage) -> Result<(), Diagnostic> {
        let (name, line) = self.expect_ident()?;
        self.expect_punct('{')?;
        let members = self.members()?;

        let instance = match self.peek_ident() {
            Some(_) => {
                let (instance, line) = self.expect_ident()?;
                self.array_suffix()?;
                self.declare(&instance, line)?;
                Some(instance)
            }
            None => {
                for m in &members {
                    self.declare(&m.name, line)?;
                }
                None
            }
        };
        self.expect_punct(';')?;

        let block = Block { name, instance, members, line, referenced: false };
        match storage {
            Storage::In => self.in_blocks.push(block),
            Storage::Out => self.out_blocks.push(block),
            _ => self.uniform_blocks.push(block),
        }
        Ok(())
    }

    /// Member list after an opening `{`, through the closing `}`.
    fn members(&mut self) -> Result<Vec<Member>, Diagnostic> {
        let mut members = Vec::new();
        while !self.is_punct('}') {
            while let Some(word) = self.peek_ident() {
                if word == "layout" {
                    self.layout()?;
                } else if AUXILIARY_QUALIFIERS.contains(&word) {
                    self.bump();
                } else {
                    break;
                }
            }

            let (type_name, line) = self.expect_ident()?;
            let ty = self.resolve_type(&type_name, line)?;
            loop {
                let (name, line) = self.expect_ident()?;
                if ty == GlslType::Void {
                    return Err(Diagnostic::new(line, format!("'{name}' : illegal use of type 'void'")));
                }
                if members.iter().any(|m: &Member| m.name == name) {
                    return Err(Diagnostic::new(line, format!("'{name}' : redefinition")));
                }
                let array = self.array_suffix()?;
                members.push(Member { name, ty: ty.clone(), array });

                let tok = self.bump();
                match tok.kind {
                    TokenKind::Punct(',') => continue,
                    TokenKind::Punct(';') => break,
                    _ => return Err(unexpected(&tok)),
                }
            }
        }
        self.bump(); // `}`
        Ok(members)
    }

    /// `[size]` after a name. The size is an integral constant expression
    /// over literals and `const` globals.
    fn array_suffix(&mut self) -> Result<Option<u32>, Diagnostic> {
        if !self.is_punct('[') {
            return Ok(None);
        }
        let open = self.bump();
        let mut tokens = Vec::new();
        loop {
            let tok = self.bump();
            match tok.kind {
                TokenKind::Punct(']') => break,
                TokenKind::Eof | TokenKind::Punct(';' | '[' | '{' | '}') => return Err(unexpected(&tok)),
                _ => tokens.push(tok),
            }
        }

        match self.constant(&tokens) {
            Some(n) if n <= 0 => Err(Diagnostic::new(open.line, "array size must be greater than zero")),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| Diagnostic::new(open.line, "array size is too large")),
            None => Err(Diagnostic::new(open.line, "array size must be a constant integral expression")),
        }
    }

    /// Value of an integral constant expression, if `tokens` form one.
    fn constant(&self, tokens: &[Token]) -> Option<i64> {
        let terms = tokens
            .iter()
            .map(|tok| match &tok.kind {
                TokenKind::Number(text) => parse_uint(text).map(|n| Term::Num(n.into())),
                TokenKind::Ident(name) => self.consts.get(name).copied().map(Term::Num),
                TokenKind::Punct(c) => Term::op(*c),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        expr::evaluate(&terms)
    }

    /// Value of a uniform initializer made of literals: `1.5`, `-2`,
    /// `true`, `vec3(0.5)` or `vec4(1.0, 0.0, 0.0, 1.0)`.
    fn literal_value(&self, ty: &GlslType, tokens: &[Token]) -> Option<UniformValue> {
        let args = match tokens {
            [ctor, open, inner @ .., close]
                if matches!(&ctor.kind, TokenKind::Ident(name) if GlslType::builtin(name).as_ref() == Some(ty))
                    && open.kind == TokenKind::Punct('(')
                    && close.kind == TokenKind::Punct(')') =>
            {
                inner
            }
            all => all,
        };
        let components = args
            .split(|tok| tok.kind == TokenKind::Punct(','))
            .map(|arg| self.literal(arg))
            .collect::<Option<Vec<f64>>>()?;

        fn fill<const N: usize>(components: &[f64]) -> Option<[f32; N]> {
            match components {
                [splat] => Some([*splat as f32; N]),
                all if all.len() == N => Some(std::array::from_fn(|i| all[i] as f32)),
                _ => None,
            }
        }

        match (ty, components.as_slice()) {
            (GlslType::Bool, [v]) => Some(UniformValue::Bool(*v != 0.0)),
            (GlslType::Int, [v]) => Some(UniformValue::Int(*v as i32)),
            (GlslType::Float, [v]) => Some(UniformValue::Float(*v as f32)),
            (GlslType::Vec(2), all) => fill(all).map(UniformValue::Vec2),
            (GlslType::Vec(3), all) => fill(all).map(UniformValue::Vec3),
            (GlslType::Vec(4), all) => fill(all).map(UniformValue::Vec4),
            _ => None,
        }
    }

    fn literal(&self, tokens: &[Token]) -> Option<f64> {
        let (negate, rest) = match tokens {
            [minus, rest @ ..] if minus.kind == TokenKind::Punct('-') => (true, rest),
            _ => (false, tokens),
        };
        let [tok] = rest else {
            return None;
        };
        let value = match &tok.kind {
            TokenKind::Number(text) => parse_number(text)?,
            TokenKind::Ident(word) if word == "true" => 1.0,
            TokenKind::Ident(word) if word == "false" => 0.0,
            TokenKind::Ident(word) => *self.consts.get(word)? as f64,
            _ => return None,
        };
        Some(if negate { -value } else { value })
    }

    /// Initializer tokens up to the next top-level `,` or `;`.
    fn initializer(&mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::Eof => return Err(unexpected(&tok)),
                TokenKind::Punct(',' | ';') if depth == 0 => return Ok(tokens),
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => {
                    depth = depth.checked_sub(1).ok_or_else(|| unexpected(&tok))?;
                }
                TokenKind::Ident(name) => {
                    self.referenced.insert(name.clone());
                }
                _ => {}
            }
            tokens.push(self.bump());
        }
    }

    // ── functions ─────────────────────────────────────────────────────────

    fn function(&mut self, ret: GlslType, name: String, line: u32) -> Result<(), Diagnostic> {
        self.expect_punct('(')?;
        let takes_nothing = self.parameters()?;

        if self.is_punct(';') {
            self.bump();
            return Ok(());
        }
        if !self.is_punct('{') {
            return Err(unexpected(self.peek()));
        }

        if name == "main" {
            if ret != GlslType::Void {
                return Err(Diagnostic::new(line, "function 'main' must return void"));
            }
            if !takes_nothing {
                return Err(Diagnostic::new(line, "function 'main' cannot take any parameters"));
            }
            if self.has_main {
                return Err(Diagnostic::new(line, "redefinition of function 'main'"));
            }
            self.has_main = true;
        }

        self.body()
    }

    /// Parameter list through the closing `)`. Returns whether it is empty
    /// (or a lone `void`).
    fn parameters(&mut self) -> Result<bool, Diagnostic> {
        if self.is_punct(')') {
            self.bump();
            return Ok(true);
        }
        if self.peek_ident() == Some("void") && self.peek_nth(1).kind == TokenKind::Punct(')') {
            self.bump();
            self.bump();
            return Ok(true);
        }

        loop {
            while let Some(word) = self.peek_ident() {
                if PARAMETER_QUALIFIERS.contains(&word) {
                    self.bump();
                } else {
                    break;
                }
            }
            let (type_name, line) = self.expect_ident()?;
            self.resolve_type(&type_name, line)?;
            if self.peek_ident().is_some() {
                self.bump();
                self.array_suffix()?;
            }

            let tok = self.bump();
            match tok.kind {
                TokenKind::Punct(',') => continue,
                TokenKind::Punct(')') => return Ok(false),
                _ => return Err(unexpected(&tok)),
            }
        }
    }

    /// Function body from `{` through its matching `}`.
    ///
    /// Brackets must balance and every scope must close after a complete
    /// statement. Identifiers seen here mark globals as referenced.
    fn body(&mut self) -> Result<(), Diagnostic> {
        let open = self.bump();
        // (bracket, flag): the flag marks `{` initializer lists and `for (` headers.
        let mut stack: Vec<(char, bool)> = vec![('{', false)];
        let mut prev = open.kind;

        while !stack.is_empty() {
            let tok = self.bump();
            match &tok.kind {
                TokenKind::Eof => return Err(unexpected(&tok)),
                TokenKind::Directive(_) => continue,
                TokenKind::Punct(';') => {
                    if matches!(stack.last(), Some(('(', false) | ('[', _))) {
                        return Err(unexpected(&tok));
                    }
                }
                TokenKind::Ident(word) => {
                    if matches!(prev, TokenKind::Number(_)) {
                        return Err(unexpected(&tok));
                    }
                    self.referenced.insert(word.clone());
                }
                TokenKind::Number(_) => {
                    let glued = match &prev {
                        TokenKind::Number(_) => true,
                        TokenKind::Ident(word) => !matches!(word.as_str(), "return" | "case"),
                        _ => false,
                    };
                    if glued {
                        return Err(unexpected(&tok));
                    }
                }
                TokenKind::Punct(c @ ('(' | '[' | '{')) => {
                    let in_initializer = stack.last().is_some_and(|&(_, init)| init);
                    let flag = match c {
                        '{' => {
                            prev == TokenKind::Punct('=')
                                || (in_initializer && matches!(prev, TokenKind::Punct(',' | '{')))
                        }
                        '(' => matches!(&prev, TokenKind::Ident(w) if w == "for"),
                        _ => false,
                    };
                    stack.push((*c, flag));
                }
                TokenKind::Punct(c @ (')' | ']' | '}')) => {
                    let Some((open, flag)) = stack.pop() else {
                        return Err(unexpected(&tok));
                    };
                    let expected = match open {
                        '(' => ')',
                        '[' => ']',
                        _ => '}',
                    };
                    if *c != expected {
                        return Err(unexpected(&tok));
                    }
                    if *c == '}' && !flag && !matches!(prev, TokenKind::Punct(';' | '{' | '}')) {
                        return Err(Diagnostic::new(tok.line, "syntax error, unexpected '}', expecting ';'"));
                    }
                }
                _ => {}
            }
            prev = tok.kind;
        }
        Ok(())
    }

    // ── names ─────────────────────────────────────────────────────────────

    fn resolve_type(&self, name: &str, line: u32) -> Result<GlslType, Diagnostic> {
        if let Some(ty) = GlslType::builtin(name) {
            return Ok(ty);
        }
        if self.structs.contains_key(name) {
            return Ok(GlslType::Struct(name.to_string()));
        }
        Err(Diagnostic::new(line, format!("'{name}' : unknown type name")))
    }

    fn declare(&mut self, name: &str, line: u32) -> Result<(), Diagnostic> {
        if name.starts_with("gl_") {
            return Err(Diagnostic::new(line, format!("'{name}' : identifiers starting with 'gl_' are reserved")));
        }
        if !self.globals.insert(name.to_string()) {
            return Err(Diagnostic::new(line, format!("'{name}' : redefinition")));
        }
        Ok(())
    }
}

fn unexpected(tok: &Token) -> Diagnostic {
    Diagnostic::new(tok.line, format!("syntax error, unexpected {}", tok.kind))
}

fn parse_uint(text: &str) -> Option<u32> {
    let digits = text.trim_end_matches(['u', 'U']);
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    if text.starts_with("0x") || text.starts_with("0X") {
        return parse_uint(text).map(f64::from);
    }
    text.trim_end_matches(['f', 'F', 'u', 'U', 'l', 'L']).parse().ok()
}

fn parse_version(words: Vec<&str>, line: u32) -> Result<Version, Diagnostic> {
    let invalid = |msg: String| Diagnostic::new(line, msg);

    let (number, profile) = match words.as_slice() {
        [number] => (*number, None),
        [number, profile] => (*number, Some(*profile)),
        _ => return Err(invalid("invalid #version directive".to_string())),
    };
    let number: u16 = number
        .parse()
        .map_err(|_| invalid(format!("invalid version number '{number}'")))?;
    if !SUPPORTED_VERSIONS.contains(&number) {
        return Err(invalid(format!("version '{number}' is not supported")));
    }

    let es_only = matches!(number, 300 | 310 | 320);
    let es = match profile {
        None if es_only => return Err(invalid(format!("version '{number}' requires the 'es' profile"))),
        None => number == 100,
        Some("es") if es_only || number == 100 => true,
        Some("core" | "compatibility") if number >= 150 && !es_only => false,
        Some(other) => return Err(invalid(format!("profile '{other}' is not valid for version '{number}'"))),
    };

    Ok(Version { number, es })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
uniform float delta;
uniform mat4 unused;
out vec3 vertexColor;

void main()
{
    gl_Position = vec4(aPos.x + delta, aPos.y, aPos.z, 1.0f);
    vertexColor = aColor;
}
";

    fn vertex(src: &str) -> Result<StageInterface, Diagnostic> {
        compile(ShaderStage::Vertex, src)
    }

    fn fragment(src: &str) -> Result<StageInterface, Diagnostic> {
        compile(ShaderStage::Fragment, src)
    }

    fn err_line(result: Result<StageInterface, Diagnostic>) -> u32 {
        result.unwrap_err().line
    }

    // ── interface extraction ──────────────────────────────────────────────

    #[test]
    fn collects_inputs_with_locations() {
        let iface = vertex(VERTEX).unwrap();
        let inputs: Vec<_> = iface.inputs.iter().map(|v| (v.name.as_str(), v.location)).collect();
        assert_eq!(inputs, vec![("aPos", Some(0)), ("aColor", Some(1))]);
        assert_eq!(iface.inputs[0].ty, GlslType::Vec(3));
    }

    #[test]
    fn collects_outputs_and_uniforms() {
        let iface = vertex(VERTEX).unwrap();
        assert_eq!(iface.outputs[0].name, "vertexColor");
        let uniforms: Vec<_> = iface.uniforms.iter().map(|v| (v.name.as_str(), v.referenced)).collect();
        assert_eq!(uniforms, vec![("delta", true), ("unused", false)]);
    }

    #[test]
    fn records_version_and_main() {
        let iface = vertex(VERTEX).unwrap();
        assert_eq!(iface.version, Version { number: 330, es: false });
        assert!(iface.has_main);
    }

    #[test]
    fn missing_main_still_compiles() {
        let iface = fragment("#version 330 core\nout vec4 c;\n").unwrap();
        assert!(!iface.has_main);
    }

    #[test]
    fn interface_block_with_instance() {
        let iface = vertex(
            "#version 330 core\nout VS_OUT { vec3 color; vec2 uv; } vs_out;\nvoid main() { vs_out.color = vec3(1.0); }\n",
        )
        .unwrap();
        let block = &iface.out_blocks[0];
        assert_eq!(block.name, "VS_OUT");
        assert_eq!(block.instance.as_deref(), Some("vs_out"));
        assert_eq!(block.members.len(), 2);
        assert!(block.referenced);
    }

    #[test]
    fn arrays_and_multiple_declarators() {
        let iface = fragment("#version 330 core\nuniform float w[4], bias;\nout vec4 c;\nvoid main() { c = vec4(w[0] + bias); }\n")
            .unwrap();
        assert_eq!(iface.uniforms[0].array, Some(4));
        assert_eq!(iface.uniforms[1].name, "bias");
        assert_eq!(iface.uniforms[1].array, None);
    }

    #[test]
    fn struct_types_are_usable_after_definition() {
        let iface = fragment(
            "#version 330 core\nstruct Light { vec3 pos; float power; };\nuniform Light light;\nout vec4 c;\nvoid main() { c = vec4(light.pos, light.power); }\n",
        )
        .unwrap();
        assert_eq!(iface.uniforms[0].ty, GlslType::Struct("Light".into()));
        let members: Vec<_> = iface.structs["Light"].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["pos", "power"]);
    }

    #[test]
    fn const_globals_size_arrays() {
        let iface = fragment(
            "#version 330 core
const int N = 3;
const uint M = N * 2u;
uniform float w[N], v[M + 1];
out vec4 c;
void main() { c = vec4(w[0] + v[0]); }
",
        )
        .unwrap();
        assert_eq!(iface.uniforms[0].array, Some(3));
        assert_eq!(iface.uniforms[1].array, Some(7));
    }

    #[test]
    fn uniform_initializers_are_kept_when_literal() {
        let iface = fragment(
            "#version 330 core
uniform float scale = 1.5;
uniform int bias = -2;
uniform bool on = true;
uniform vec3 grey = vec3(0.5);
uniform vec4 red = vec4(1.0, 0.0, 0.0, 1.0);
uniform float mixed = 1.0 + 2.0;
uniform float plain;
out vec4 c;
void main() { c = red; }
",
        )
        .unwrap();
        let values: Vec<_> = iface.uniforms.iter().map(|u| u.initializer).collect();
        assert_eq!(
            values,
            vec![
                Some(UniformValue::Float(1.5)),
                Some(UniformValue::Int(-2)),
                Some(UniformValue::Bool(true)),
                Some(UniformValue::Vec3([0.5; 3])),
                Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0])),
                None,
                None,
            ]
        );
    }

    #[test]
    fn varying_maps_to_stage_direction() {
        let vs = vertex("#version 120\nattribute vec3 p;\nvarying vec3 c;\nvoid main() { c = p; gl_Position = vec4(p, 1.0); }\n")
            .unwrap();
        assert_eq!(vs.inputs[0].name, "p");
        assert_eq!(vs.outputs[0].name, "c");

        let fs = fragment("#version 120\nvarying vec3 c;\nvoid main() { gl_FragColor = vec4(c, 1.0); }\n").unwrap();
        assert_eq!(fs.inputs[0].name, "c");
    }

    #[test]
    fn prototypes_helpers_and_initializer_lists() {
        fragment(
            "#version 430 core
out vec4 c;
float twice(in float x);
float twice(in float x) { return x * 2.0; }
void main()
{
    float k[2] = {1.0, 2.0};
    if (k[0] > 0.5) { c = vec4(twice(k[1])); } else { c = vec4(0.0); }
}
",
        )
        .unwrap();
    }

    // ── preprocessor ──────────────────────────────────────────────────────

    #[test]
    fn excluded_group_is_not_compiled() {
        let iface = vertex("#version 330 core\n#if 0\nthis is not glsl @@\n#endif\nvoid main() {}\n").unwrap();
        assert!(iface.has_main);
    }

    #[test]
    fn macro_names_a_type() {
        let iface = vertex(
            "#version 330 core\n#define POS vec3\nlayout (location = 0) in POS aPos;\nvoid main() { gl_Position = vec4(aPos, 1.0); }\n",
        )
        .unwrap();
        assert_eq!(iface.inputs[0].ty, GlslType::Vec(3));
    }

    #[test]
    fn es_only_branch_is_skipped_on_desktop() {
        let src = "#version 330 core
#ifdef GL_ES
precision mediump float;
#error desktop only
#else
uniform float k;
#endif
out vec4 c;
void main() { c = vec4(k); }
";
        let iface = fragment(src).unwrap();
        assert_eq!(iface.uniforms[0].name, "k");
    }

    #[test]
    fn diagnostics_keep_source_lines_after_excluded_groups() {
        let src = "#version 330 core
#if 0
skipped
#endif
out vec4 c;
void main() { c = vec4(1.0) }
";
        assert_eq!(err_line(fragment(src)), 6);
    }

    #[test]
    fn unterminated_conditional() {
        let err = vertex("#version 330 core\n#ifdef X\nvoid main() {}\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    // ── version ───────────────────────────────────────────────────────────

    #[test]
    fn version_is_required() {
        let err = vertex("void main() {}").unwrap_err();
        assert_eq!(err.to_string(), "0:1: error: #version directive required before declarations");
    }

    #[test]
    fn version_after_other_directive_is_rejected() {
        assert_eq!(err_line(vertex("#define X 1\n#version 330 core\nvoid main() {}")), 1);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        assert!(vertex("#version 999\nvoid main() {}").is_err());
        assert!(vertex("#version 300\nvoid main() {}").is_err());
        assert!(vertex("#version 330 es\nvoid main() {}").is_err());
    }

    #[test]
    fn es_profile_is_recorded() {
        let iface = vertex("#version 300 es\nvoid main() {}").unwrap();
        assert!(iface.version.es);
    }

    #[test]
    fn error_directive_fails_compilation() {
        assert_eq!(err_line(vertex("#version 330 core\n\n#error nope\n")), 3);
    }

    // ── syntax errors ─────────────────────────────────────────────────────

    #[test]
    fn missing_semicolon_before_closing_brace() {
        let src = "#version 330 core\nout vec4 c;\nvoid main()\n{\n  c = vec4(1.0)\n}\n";
        let err = fragment(src).unwrap_err();
        assert_eq!(err.line, 6);
        assert!(err.message.contains("expecting ';'"));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_eq!(err_line(fragment("#version 330 core\nout vec4 c;\nvoid main() {\n c = vec4(1.0;\n}\n")), 4);
    }

    #[test]
    fn unterminated_body() {
        assert!(fragment("#version 330 core\nvoid main() {\n").is_err());
    }

    #[test]
    fn unknown_type_in_declaration() {
        let err = vertex("#version 330 core\nin vec5 p;\nvoid main() {}\n").unwrap_err();
        assert_eq!(err.to_string(), "0:2: error: 'vec5' : unknown type name");
    }

    #[test]
    fn statement_at_global_scope() {
        assert_eq!(err_line(vertex("#version 330 core\ngl_Position = vec4(1.0);\n")), 2);
    }

    #[test]
    fn literal_followed_by_identifier() {
        assert!(fragment("#version 330 core\nout vec4 c;\nvoid main() { c = vec4(1.0 x); }\n").is_err());
    }

    #[test]
    fn redefinition_is_rejected() {
        let err = fragment("#version 330 core\nuniform float a;\nuniform vec2 a;\nvoid main() {}\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("redefinition"));
    }

    #[test]
    fn array_size_must_be_constant() {
        let err = fragment("#version 330 core\nuniform int n;\nuniform float w[n];\nvoid main() {}\n").unwrap_err();
        assert_eq!(err.to_string(), "0:3: error: array size must be a constant integral expression");
        assert!(fragment("#version 330 core\nconst int N = 0;\nuniform float w[N];\nvoid main() {}\n").is_err());
    }

    #[test]
    fn const_without_initializer() {
        assert!(vertex("#version 330 core\nconst float k;\nvoid main() {}\n").is_err());
    }

    #[test]
    fn attribute_in_fragment_stage() {
        assert!(fragment("#version 120\nattribute vec3 p;\nvoid main() {}\n").is_err());
    }

    #[test]
    fn main_with_parameters() {
        assert!(vertex("#version 330 core\nvoid main(int x) {}\n").is_err());
        assert!(vertex("#version 330 core\nint main() { return 0; }\n").is_err());
    }

    #[test]
    fn second_main_is_rejected() {
        assert!(vertex("#version 330 core\nvoid main() {}\nvoid main() {}\n").is_err());
    }

    #[test]
    fn reserved_prefix_is_rejected() {
        assert!(vertex("#version 330 core\nuniform float gl_thing;\nvoid main() {}\n").is_err());
    }

    #[test]
    fn return_literal_is_accepted() {
        fragment("#version 330 core\nout vec4 c;\nfloat one() { return 1.0; }\nvoid main() { c = vec4(one()); }\n")
            .unwrap();
    }
}
