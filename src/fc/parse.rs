//! The rule-file reader.
//!
//! ```text
//! # comment
//! match pattern {
//!     test any family == "Helvetica";
//!     edit family assign strong "Arial", "Liberation Sans";
//! }
//! ```

use super::charset::Charset;
use super::expr::{BinaryOp, CompareOp, Expr, Qualifier, UnaryOp};
use super::lang::LangSet;
use super::object::{constant, Object, ObjectRegistry};
use super::rules::{Edit, EditMode, MatchKind, Rule, Test, TestQual};
use super::value::{Binding, Value};
use crate::text_parser::TextParser;
use crate::Error;

type PResult<T> = Result<T, String>;

/// How deep parentheses, conditionals, calls and unary operators may nest.
const MAX_EXPR_DEPTH: usize = 128;

struct RuleParser<'a, 'r> {
    s: TextParser<'a>,
    objects: &'r mut ObjectRegistry,
    depth: usize,
}

/// Parses one rule source, registering unknown object names in `objects`.
pub(crate) fn parse_rules(
    source_name: &str,
    text: &str,
    objects: &mut ObjectRegistry,
) -> Result<Vec<Rule>, Error> {
    let mut p = RuleParser {
        s: TextParser::new(text),
        objects,
        depth: 0,
    };

    let mut rules = Vec::new();
    loop {
        p.skip_trivia();
        if p.s.at_end() {
            break;
        }

        match p.parse_rule() {
            Ok(rule) => rules.push(rule),
            Err(message) => {
                let (line, column) = p.s.line_column();
                return Err(Error::Parse {
                    source_name: source_name.to_string(),
                    line,
                    column,
                    message,
                });
            }
        }
    }

    Ok(rules)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

impl<'a> RuleParser<'a, '_> {
    /// Skips whitespace and `#` comments.
    fn skip_trivia(&mut self) {
        loop {
            self.s.skip_spaces();
            if self.s.curr_byte() != Some(b'#') {
                return;
            }
            self.s.skip_bytes(|c| c != b'\n');
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_trivia();
        self.s.curr_byte()
    }

    fn expect(&mut self, c: u8) -> PResult<()> {
        match self.peek() {
            Some(b) if b == c => {
                self.s.advance(1);
                Ok(())
            }
            Some(b) => Err(format!("expected '{}', found '{}'", c as char, b as char)),
            None => Err(format!("expected '{}', found end of input", c as char)),
        }
    }

    /// Consumes `c` if it is next.
    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.s.advance(1);
            true
        } else {
            false
        }
    }

    /// Consumes a two-byte operator if it is next.
    fn eat2(&mut self, a: u8, b: u8) -> bool {
        if self.peek() == Some(a) && self.s.peek_byte(1) == Some(b) {
            self.s.advance(2);
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> PResult<&'a str> {
        match self.peek() {
            Some(c) if is_ident_start(c) => Ok(self.s.consume_ident()),
            Some(c) => Err(format!("expected a name, found '{}'", c as char)),
            None => Err("expected a name, found end of input".to_string()),
        }
    }

    /// Returns the next identifier without consuming it.
    fn peek_ident(&mut self) -> Option<&'a str> {
        let start = self.s.pos();
        let ident = self.ident().ok();
        self.rewind(start);
        ident
    }

    fn rewind(&mut self, pos: usize) {
        self.s.set_pos(pos);
    }

    fn keyword(&mut self, word: &str) -> PResult<()> {
        let start = self.s.pos();
        match self.ident() {
            Ok(w) if w == word => Ok(()),
            Ok(w) => {
                self.rewind(start);
                Err(format!("expected '{}', found '{}'", word, w))
            }
            Err(e) => Err(e),
        }
    }

    fn parse_rule(&mut self) -> PResult<Rule> {
        self.keyword("match")?;
        let kind = match self.ident()? {
            "pattern" => MatchKind::Pattern,
            "font" => MatchKind::Font,
            "scan" => MatchKind::Scan,
            other => return Err(format!("unknown match target '{}'", other)),
        };
        self.expect(b'{')?;

        let mut rule = Rule {
            kind,
            tests: Vec::new(),
            edits: Vec::new(),
        };

        while !self.eat(b'}') {
            match self.ident()? {
                "test" => rule.tests.push(self.parse_test()?),
                "edit" => rule.edits.push(self.parse_edit()?),
                other => return Err(format!("expected 'test' or 'edit', found '{}'", other)),
            }
        }

        Ok(rule)
    }

    fn object(&mut self) -> PResult<Object> {
        let name = self.ident()?;
        self.objects
            .register(name)
            .ok_or_else(|| format!("too many custom objects, cannot add '{}'", name))
    }

    fn qualifier(&mut self) -> Qualifier {
        let start = self.s.pos();
        let qualifier = match self.peek_ident() {
            Some("pattern") => Qualifier::Pattern,
            Some("font") => Qualifier::Font,
            _ => return Qualifier::Default,
        };

        let _ = self.ident();
        if self.s.curr_byte() == Some(b'.') {
            self.s.advance(1);
            qualifier
        } else {
            self.rewind(start);
            Qualifier::Default
        }
    }

    fn parse_test(&mut self) -> PResult<Test> {
        let qual = match self.peek_ident() {
            Some("any") => Some(TestQual::Any),
            Some("all") => Some(TestQual::All),
            Some("first") => Some(TestQual::First),
            Some("not_first") => Some(TestQual::NotFirst),
            Some("last") => Some(TestQual::Last),
            _ => None,
        };
        if qual.is_some() {
            self.ident()?;
        }

        let qualifier = self.qualifier();
        let object = self.object()?;
        let op = self
            .compare_op()
            .ok_or_else(|| "expected a comparison operator".to_string())?;
        let expr = self.expr()?;
        self.expect(b';')?;

        Ok(Test {
            qualifier,
            qual: qual.unwrap_or_default(),
            object,
            op,
            expr,
        })
    }

    fn parse_edit(&mut self) -> PResult<Edit> {
        let object = self.object()?;
        let mode_name = self.ident()?;
        let mode =
            EditMode::parse(mode_name).ok_or_else(|| format!("unknown edit mode '{}'", mode_name))?;

        let binding = match self.peek_ident() {
            Some("strong") => Some(Binding::Strong),
            Some("weak") => Some(Binding::Weak),
            Some("same") => Some(Binding::Same),
            _ => None,
        };
        if binding.is_some() {
            self.ident()?;
        }

        let mut exprs = Vec::new();
        if !self.eat(b';') {
            loop {
                exprs.push(self.expr()?);
                if self.eat(b';') {
                    break;
                }
                self.expect(b',')?;
            }
        }

        Ok(Edit {
            object,
            mode,
            binding: binding.unwrap_or(Binding::Weak),
            exprs,
        })
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek()? {
            b'=' if self.s.peek_byte(1) == Some(b'=') => "==",
            b'!' if self.s.peek_byte(1) == Some(b'=') => "!=",
            b'<' if self.s.peek_byte(1) == Some(b'=') => "<=",
            b'>' if self.s.peek_byte(1) == Some(b'=') => ">=",
            b'<' => "<",
            b'>' => ">",
            c if is_ident_start(c) => {
                let word = self.peek_ident()?;
                let op = CompareOp::parse(word)?;
                self.s.advance(word.len());
                return Some(op);
            }
            _ => return None,
        };
        self.s.advance(op.len());
        CompareOp::parse(op)
    }

    /// Runs `f` one expression level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err("expression nested too deeply".to_string());
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> PResult<Expr> {
        self.nested(Self::cond_expr)
    }

    fn cond_expr(&mut self) -> PResult<Expr> {
        let cond = self.or_expr()?;
        if !self.eat(b'?') {
            return Ok(cond);
        }

        let then = self.expr()?;
        self.expect(b':')?;
        let otherwise = self.expr()?;
        Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat2(b'|', b'|') {
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut left = self.cmp_expr()?;
        while self.eat2(b'&', b'&') {
            let right = self.cmp_expr()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn cmp_expr(&mut self) -> PResult<Expr> {
        let left = self.add_expr()?;
        match self.compare_op() {
            Some(op) => {
                let right = self.add_expr()?;
                Ok(Expr::Binary(BinaryOp::Compare(op), Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn add_expr(&mut self) -> PResult<Expr> {
        let mut left = self.mul_expr()?;
        loop {
            let op = if self.eat(b'+') {
                BinaryOp::Plus
            } else if self.eat(b'-') {
                BinaryOp::Minus
            } else {
                return Ok(left);
            };
            let right = self.mul_expr()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn mul_expr(&mut self) -> PResult<Expr> {
        let mut left = self.unary_expr()?;
        loop {
            let op = if self.eat(b'*') {
                BinaryOp::Times
            } else if self.eat(b'/') {
                BinaryOp::Divide
            } else {
                return Ok(left);
            };
            let right = self.unary_expr()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        self.nested(Self::unary_or_primary)
    }

    fn unary_or_primary(&mut self) -> PResult<Expr> {
        if self.peek() == Some(b'!') && self.s.peek_byte(1) != Some(b'=') {
            self.s.advance(1);
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary_expr()?)));
        }

        if self.eat(b'-') {
            // Fold negative literals.
            return Ok(match self.unary_expr()? {
                Expr::Const(Value::Int(i)) => Expr::Const(Value::Int(-i)),
                Expr::Const(Value::Float(f)) => Expr::Const(Value::Float(-f)),
                e => Expr::Unary(UnaryOp::Negate, Box::new(e)),
            });
        }

        self.primary()
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.peek() {
            Some(b'(') => {
                self.s.advance(1);
                let e = self.expr()?;
                self.expect(b')')?;
                Ok(e)
            }
            Some(b'"') | Some(b'\'') => Ok(Expr::Const(Value::String(self.string()?))),
            Some(c) if c.is_ascii_digit() || c == b'.' => Ok(Expr::Const(self.number()?)),
            Some(c) if is_ident_start(c) => self.name_expr(),
            Some(c) => Err(format!("unexpected '{}' in expression", c as char)),
            None => Err("unexpected end of input in expression".to_string()),
        }
    }

    fn string(&mut self) -> PResult<String> {
        let quote = self
            .s
            .consume_quote()
            .ok_or_else(|| "expected a string".to_string())?;

        let mut out = String::new();
        loop {
            let chunk = self.s.consume_bytes(|c| c != quote && c != b'\\');
            out.push_str(chunk);
            match self.s.curr_byte() {
                Some(b'\\') => {
                    self.s.advance(1);
                    match self.s.curr_byte() {
                        Some(c @ (b'\\' | b'"' | b'\'')) => out.push(c as char),
                        Some(b'n') => out.push('\n'),
                        _ => return Err("invalid escape sequence".to_string()),
                    }
                    self.s.advance(1);
                }
                Some(_) => {
                    self.s.advance(1);
                    return Ok(out);
                }
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn number(&mut self) -> PResult<Value> {
        if self.s.curr_byte() == Some(b'0') && matches!(self.s.peek_byte(1), Some(b'x' | b'X')) {
            self.s.advance(2);
            let digits = self.s.consume_bytes(|c| c.is_ascii_hexdigit());
            return i32::from_str_radix(digits, 16)
                .map(Value::Int)
                .map_err(|_| format!("invalid hex number '0x{}'", digits));
        }

        let text = self.s.consume_bytes(|c| c.is_ascii_digit() || c == b'.');
        if text.contains('.') {
            match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(format!("invalid number '{}'", text)),
            }
        } else {
            text.parse::<i32>()
                .map(Value::Int)
                .map_err(|_| format!("invalid number '{}'", text))
        }
    }

    fn args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(b'(')?;
        let mut args = Vec::new();
        if self.eat(b')') {
            return Ok(args);
        }

        loop {
            args.push(self.expr()?);
            if self.eat(b')') {
                return Ok(args);
            }
            self.expect(b',')?;
        }
    }

    fn code_point(&mut self) -> PResult<u32> {
        match self.number()? {
            Value::Int(i) => u32::try_from(i).map_err(|_| format!("invalid code point {}", i)),
            _ => Err("expected an integer code point".to_string()),
        }
    }

    fn charset(&mut self) -> PResult<Charset> {
        self.expect(b'(')?;
        let mut cs = Charset::new();
        if self.eat(b')') {
            return Ok(cs);
        }

        loop {
            self.skip_trivia();
            let start = self.code_point()?;
            let end = if self.eat(b'-') {
                self.skip_trivia();
                self.code_point()?
            } else {
                start
            };
            cs.insert_range(start, end);

            if self.eat(b')') {
                return Ok(cs);
            }
            self.expect(b',')?;
        }
    }

    fn langset(&mut self) -> PResult<LangSet> {
        self.expect(b'(')?;
        let mut set = LangSet::new();
        if self.eat(b')') {
            return Ok(set);
        }

        loop {
            self.skip_trivia();
            set.add(&self.string()?);
            if self.eat(b')') {
                return Ok(set);
            }
            self.expect(b',')?;
        }
    }

    fn name_expr(&mut self) -> PResult<Expr> {
        let qualifier = self.qualifier();
        let name = self.ident()?;

        if qualifier == Qualifier::Default && self.peek() == Some(b'(') {
            return self.call(name);
        }

        if qualifier == Qualifier::Default {
            match name {
                "true" => return Ok(Expr::Const(Value::Bool(true))),
                "false" => return Ok(Expr::Const(Value::Bool(false))),
                _ => {}
            }

            if let Some((_, value)) = constant(name) {
                return Ok(Expr::Const(Value::Int(value)));
            }
        }

        match self.objects.lookup(name) {
            Some(object) => Ok(Expr::Field(qualifier, object)),
            None => Err(format!("unknown name '{}'", name)),
        }
    }

    fn call(&mut self, name: &str) -> PResult<Expr> {
        let unary = match name {
            "floor" => UnaryOp::Floor,
            "ceil" => UnaryOp::Ceil,
            "round" => UnaryOp::Round,
            "trunc" => UnaryOp::Trunc,
            "charset" => return Ok(Expr::Const(Value::Charset(self.charset()?))),
            "langset" => return Ok(Expr::Const(Value::LangSet(self.langset()?))),
            "matrix" => {
                let items: [Expr; 4] = self
                    .args()?
                    .try_into()
                    .map_err(|_| "'matrix' takes four arguments".to_string())?;
                return Ok(Expr::Matrix(Box::new(items)));
            }
            "range" => {
                let [begin, end]: [Expr; 2] = self
                    .args()?
                    .try_into()
                    .map_err(|_| "'range' takes two arguments".to_string())?;
                return Ok(Expr::Range(Box::new(begin), Box::new(end)));
            }
            _ => return Err(format!("unknown function '{}'", name)),
        };

        let [arg]: [Expr; 1] = self
            .args()?
            .try_into()
            .map_err(|_| format!("'{}' takes one argument", name))?;
        Ok(Expr::Unary(unary, Box::new(arg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Vec<Rule>, Error> {
        parse_rules("test.conf", text, &mut ObjectRegistry::new())
    }

    #[test]
    fn alias_rule() {
        let rules = parse(
            r#"
            # Prefer a metric-compatible family.
            match pattern {
                test family == "Helvetica";
                edit family assign strong "Arial", "Liberation Sans";
            }
            "#,
        )
        .unwrap();

        assert_eq!(
            rules,
            vec![Rule {
                kind: MatchKind::Pattern,
                tests: vec![Test {
                    qualifier: Qualifier::Default,
                    qual: TestQual::Any,
                    object: Object::FAMILY,
                    op: CompareOp::Equal,
                    expr: Expr::Const("Helvetica".into()),
                }],
                edits: vec![Edit {
                    object: Object::FAMILY,
                    mode: EditMode::Assign,
                    binding: Binding::Strong,
                    exprs: vec![
                        Expr::Const("Arial".into()),
                        Expr::Const("Liberation Sans".into()),
                    ],
                }],
            }]
        );
    }

    #[test]
    fn qualified_tests_and_expressions() {
        let rules = parse(
            "match font {
                test pattern.weight >= bold;
                test font.weight < 150;
                test all lang contains langset(\"en\", 'fr');
                edit embolden assign true;
                edit matrix assign matrix * matrix(1, 0.2, 0, 1);
                edit pixelsize assign pixelsize * 1.5 > 20 ? 20.0 : -pixelsize;
                edit charset append charset(0x41 - 0x5a, 97);
                edit style delete;
            }",
        )
        .unwrap();

        let rule = &rules[0];
        assert_eq!(rule.kind, MatchKind::Font);
        assert_eq!(rule.tests[0].qualifier, Qualifier::Pattern);
        assert_eq!(rule.tests[0].op, CompareOp::MoreEqual);
        assert_eq!(rule.tests[0].expr, Expr::Const(Value::Int(200)));
        assert_eq!(rule.tests[1].qualifier, Qualifier::Font);
        assert_eq!(rule.tests[2].qual, TestQual::All);
        assert_eq!(
            rule.tests[2].expr,
            Expr::Const(Value::LangSet(LangSet::from_tags(["en", "fr"])))
        );
        assert_eq!(rule.edits.len(), 5);
        assert_eq!(rule.edits[0].binding, Binding::Weak);
        assert!(matches!(
            rule.edits[1].exprs[0],
            Expr::Binary(BinaryOp::Times, _, _)
        ));
        assert!(matches!(rule.edits[2].exprs[0], Expr::Cond(..)));
        assert_eq!(
            rule.edits[3].exprs[0],
            Expr::Const(Value::Charset(Charset::from_ranges([(0x41, 0x5a), (97, 97)])))
        );
        assert!(rule.edits[4].exprs.is_empty());
    }

    #[test]
    fn custom_objects_are_registered() {
        let mut objects = ObjectRegistry::new();
        let rules = parse_rules(
            "custom.conf",
            "match pattern { test myflag == true; edit myflag assign false; }",
            &mut objects,
        )
        .unwrap();
        assert_eq!(rules[0].tests[0].object, Object::FIRST_CUSTOM);
        assert_eq!(objects.custom_names(), ["myflag"]);
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse("match pattern {\n  test family ~ \"x\";\n}").unwrap_err();
        match err {
            Error::Parse {
                source_name,
                line,
                column,
                ..
            } => {
                assert_eq!(source_name, "test.conf");
                assert_eq!((line, column), (2, 15));
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(parse("match nothing {}").is_err());
        assert!(parse("match pattern { edit family assign \"x\" }").is_err());
        assert!(parse("match pattern { edit family assign unknownname; }").is_err());
        assert!(parse("match pattern { test family == \"x").is_err());
        assert!(parse("").unwrap().is_empty());
    }

    fn nested_test(open: &str, close: &str, levels: usize) -> String {
        format!(
            "match pattern {{ test family == {}1{}; }}",
            open.repeat(levels),
            close.repeat(levels)
        )
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        assert!(parse(&nested_test("(", ")", 50)).is_ok());
        assert!(parse(&nested_test("!", "", 100)).is_ok());

        for text in [nested_test("(", ")", 20_000), nested_test("!", "", 20_000)] {
            match parse(&text) {
                Err(Error::Parse { message, .. }) => {
                    assert_eq!(message, "expression nested too deeply")
                }
                other => panic!("unexpected result {:?}", other),
            }
        }
    }
}
