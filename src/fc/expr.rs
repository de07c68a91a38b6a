use serde::{Deserialize, Serialize};

use super::object::Object;
use super::pattern::Pattern;
use super::value::{Matrix, Range, Value};

/// Which pattern an object reference reads from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Qualifier {
    /// The pattern the rule is being applied to.
    #[default]
    Default,
    /// The query pattern.
    Pattern,
    /// The font pattern. Only meaningful in the `font` stage.
    Font,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    More,
    MoreEqual,
    Contains,
    NotContains,
}

impl CompareOp {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "==" => CompareOp::Equal,
            "!=" => CompareOp::NotEqual,
            "<" => CompareOp::Less,
            "<=" => CompareOp::LessEqual,
            ">" => CompareOp::More,
            ">=" => CompareOp::MoreEqual,
            "contains" => CompareOp::Contains,
            "not_contains" => CompareOp::NotContains,
            _ => return None,
        })
    }

    /// Whether values of different kinds satisfy the operator.
    fn holds_across_kinds(self) -> bool {
        matches!(self, CompareOp::NotEqual | CompareOp::NotContains)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Floor,
    Ceil,
    Round,
    Trunc,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Compare(CompareOp),
}

/// A value expression of a rule.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Expr {
    Const(Value),
    Field(Qualifier, Object),
    Matrix(Box<[Expr; 4]>),
    Range(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// The patterns an expression may reference.
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    /// The pattern being edited.
    pub target: &'a Pattern,
    pub query: Option<&'a Pattern>,
    pub font: Option<&'a Pattern>,
}

impl<'a> EvalContext<'a> {
    fn pattern_for(&self, qualifier: Qualifier) -> Option<&'a Pattern> {
        match qualifier {
            Qualifier::Default => Some(self.target),
            Qualifier::Pattern => self.query,
            Qualifier::Font => self.font,
        }
    }
}

impl Expr {
    /// Evaluates the expression, `None` meaning "no value", which happens
    /// when a referenced object is absent, operands do not fit or the
    /// arithmetic leaves the finite range.
    pub(crate) fn eval(&self, ctx: &EvalContext) -> Option<Value> {
        self.eval_value(ctx).filter(Value::is_finite)
    }

    fn eval_value(&self, ctx: &EvalContext) -> Option<Value> {
        match self {
            Expr::Const(v) => Some(v.clone()),
            Expr::Field(qualifier, object) => {
                ctx.pattern_for(*qualifier)?.get_at(*object, 0).ok().cloned()
            }
            Expr::Matrix(items) => {
                let mut m = [0.0; 4];
                for (slot, item) in m.iter_mut().zip(items.iter()) {
                    *slot = item.eval(ctx)?.as_number()?;
                }
                Some(Value::Matrix(Matrix {
                    xx: m[0],
                    xy: m[1],
                    yx: m[2],
                    yy: m[3],
                }))
            }
            Expr::Range(begin, end) => Some(Value::Range(Range::new(
                begin.eval(ctx)?.as_number()?,
                end.eval(ctx)?.as_number()?,
            ))),
            Expr::Unary(op, e) => eval_unary(*op, e.eval(ctx)?),
            Expr::Binary(op, left, right) => {
                // A missing operand next to a matrix reads as the identity.
                let identity = || Some(Value::Matrix(Matrix::IDENTITY));
                let (left, right) = match (left.eval(ctx), right.eval(ctx)) {
                    (None, r @ Some(Value::Matrix(_))) => (identity(), r),
                    (l @ Some(Value::Matrix(_)), None) => (l, identity()),
                    pair => pair,
                };
                eval_binary(*op, left?, right?)
            }
            Expr::Cond(cond, then, otherwise) => match cond.eval(ctx)? {
                Value::Bool(true) => then.eval(ctx),
                Value::Bool(false) => otherwise.eval(ctx),
                _ => None,
            },
        }
    }
}

fn eval_unary(op: UnaryOp, v: Value) -> Option<Value> {
    let round = |f: fn(f64) -> f64, v: Value| match v {
        Value::Int(i) => Some(Value::Int(i)),
        Value::Float(x) => Some(Value::Int(f(x) as i32)),
        _ => None,
    };

    match op {
        UnaryOp::Not => match v {
            Value::Bool(b) => Some(Value::Bool(!b)),
            _ => None,
        },
        UnaryOp::Negate => match v {
            Value::Int(i) => Some(Value::Int(i.checked_neg()?)),
            Value::Float(f) => Some(Value::Float(-f)),
            _ => None,
        },
        UnaryOp::Floor => round(f64::floor, v),
        UnaryOp::Ceil => round(f64::ceil, v),
        UnaryOp::Round => round(f64::round, v),
        UnaryOp::Trunc => round(f64::trunc, v),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Option<Value> {
    if let BinaryOp::Compare(cmp) = op {
        return Some(Value::Bool(compare_values(cmp, &left, &right)));
    }

    let left = left.promote(&right);
    let right = right.promote(&left);
    match (op, left, right) {
        (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a && b)),
        (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a || b)),
        (BinaryOp::Plus, Value::String(a), Value::String(b)) => Some(Value::String(a + &b)),
        (BinaryOp::Times, Value::Matrix(a), Value::Matrix(b)) => Some(Value::Matrix(a.multiply(&b))),
        (BinaryOp::Divide, Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                None
            } else {
                Some(Value::Float(f64::from(a) / f64::from(b)))
            }
        }
        (op, Value::Int(a), Value::Int(b)) => Some(Value::Int(match op {
            BinaryOp::Plus => a.checked_add(b)?,
            BinaryOp::Minus => a.checked_sub(b)?,
            BinaryOp::Times => a.checked_mul(b)?,
            _ => return None,
        })),
        (op, Value::Float(a), Value::Float(b)) => Some(Value::Float(match op {
            BinaryOp::Plus => a + b,
            BinaryOp::Minus => a - b,
            BinaryOp::Times => a * b,
            BinaryOp::Divide => a / b,
            _ => return None,
        })),
        _ => None,
    }
}

/// Applies a comparison operator to two values.
///
/// Values of different kinds only satisfy `!=` and `not_contains`.
pub(crate) fn compare_values(op: CompareOp, left: &Value, right: &Value) -> bool {
    let left = left.clone().promote(right);
    let right = right.clone().promote(&left);

    match (&left, &right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
                return false;
            };
            match op {
                CompareOp::Equal | CompareOp::Contains => a == b,
                CompareOp::NotEqual | CompareOp::NotContains => a != b,
                CompareOp::Less => a < b,
                CompareOp::LessEqual => a <= b,
                CompareOp::More => a > b,
                CompareOp::MoreEqual => a >= b,
            }
        }
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Equal | CompareOp::Contains => a == b,
            CompareOp::NotEqual | CompareOp::NotContains => a != b,
            _ => false,
        },
        (Value::String(a), Value::String(b)) => {
            let a = a.to_lowercase();
            let b = b.to_lowercase();
            match op {
                CompareOp::Equal => a == b,
                CompareOp::NotEqual => a != b,
                CompareOp::Contains => a.contains(&b),
                CompareOp::NotContains => !a.contains(&b),
                _ => false,
            }
        }
        (Value::Matrix(a), Value::Matrix(b)) => match op {
            CompareOp::Equal | CompareOp::Contains => a == b,
            CompareOp::NotEqual | CompareOp::NotContains => a != b,
            _ => false,
        },
        (Value::Charset(a), Value::Charset(b)) => match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Contains => b.is_subset(a),
            CompareOp::NotContains => !b.is_subset(a),
            CompareOp::Less => a.is_subset(b) && a != b,
            CompareOp::LessEqual => a.is_subset(b),
            CompareOp::More => b.is_subset(a) && a != b,
            CompareOp::MoreEqual => b.is_subset(a),
        },
        (Value::LangSet(a), Value::LangSet(b)) => match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Contains => a.contains(b),
            CompareOp::NotContains => !a.contains(b),
            _ => false,
        },
        (Value::Range(a), Value::Range(b)) => match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Contains => a.begin <= b.begin && b.end <= a.end,
            CompareOp::NotContains => !(a.begin <= b.begin && b.end <= a.end),
            CompareOp::Less => a.end < b.begin,
            CompareOp::LessEqual => a.end <= b.begin,
            CompareOp::More => a.begin > b.end,
            CompareOp::MoreEqual => a.begin >= b.end,
        },
        _ => op.holds_across_kinds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::{Charset, LangSet};
    use pretty_assertions::assert_eq;

    fn eval(e: &Expr, target: &Pattern) -> Option<Value> {
        e.eval(&EvalContext {
            target,
            query: None,
            font: None,
        })
    }

    fn bin(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> Expr {
        Expr::Binary(op, Box::new(Expr::Const(a.into())), Box::new(Expr::Const(b.into())))
    }

    #[test]
    fn arithmetic() {
        let p = Pattern::new();
        assert_eq!(eval(&bin(BinaryOp::Plus, 2, 3), &p), Some(Value::Int(5)));
        assert_eq!(eval(&bin(BinaryOp::Times, 2, 1.5), &p), Some(Value::Float(3.0)));
        assert_eq!(eval(&bin(BinaryOp::Divide, 3, 2), &p), Some(Value::Float(1.5)));
        assert_eq!(eval(&bin(BinaryOp::Divide, 3, 0), &p), None);
        assert_eq!(eval(&bin(BinaryOp::Divide, 0.0, 0.0), &p), None);
        assert_eq!(eval(&bin(BinaryOp::Times, f64::MAX, 2.0), &p), None);
        assert_eq!(
            eval(&bin(BinaryOp::Plus, "Deja", "Vu"), &p),
            Some(Value::String("DejaVu".into()))
        );
        assert_eq!(eval(&bin(BinaryOp::Plus, "a", 1), &p), None);

        let floor = Expr::Unary(UnaryOp::Floor, Box::new(Expr::Const(2.7.into())));
        assert_eq!(eval(&floor, &p), Some(Value::Int(2)));
    }

    #[test]
    fn missing_fields_yield_no_value() {
        let p = Pattern::build([(Object::WEIGHT, 100.into())]);
        let field = |o| Box::new(Expr::Field(Qualifier::Default, o));
        let sum = Expr::Binary(BinaryOp::Plus, field(Object::WEIGHT), field(Object::WEIGHT));
        assert_eq!(eval(&sum, &p), Some(Value::Int(200)));

        let missing = Expr::Binary(BinaryOp::Plus, field(Object::WEIGHT), field(Object::SLANT));
        assert_eq!(eval(&missing, &p), None);
        assert_eq!(eval(&Expr::Field(Qualifier::Font, Object::WEIGHT), &p), None);
    }

    #[test]
    fn conditional_and_matrix() {
        let p = Pattern::build([(Object::EMBOLDEN, true.into())]);
        let cond = Expr::Cond(
            Box::new(Expr::Field(Qualifier::Default, Object::EMBOLDEN)),
            Box::new(Expr::Const(1.into())),
            Box::new(Expr::Const(2.into())),
        );
        assert_eq!(eval(&cond, &p), Some(Value::Int(1)));

        let m = Expr::Matrix(Box::new([
            Expr::Const(1.into()),
            Expr::Const(0.2.into()),
            Expr::Const(0.into()),
            Expr::Const(1.into()),
        ]));
        let Some(Value::Matrix(m)) = eval(&m, &p) else {
            panic!("expected a matrix");
        };
        assert_eq!(m.xy, 0.2);

        let shear = Expr::Binary(
            BinaryOp::Times,
            Box::new(Expr::Field(Qualifier::Default, Object::MATRIX)),
            Box::new(Expr::Const(Value::Matrix(Matrix {
                xx: 1.0,
                xy: 0.2,
                yx: 0.0,
                yy: 1.0,
            }))),
        );
        let Some(Value::Matrix(m)) = eval(&shear, &p) else {
            panic!("expected a matrix");
        };
        assert_eq!((m.xx, m.xy), (1.0, 0.2));
    }

    #[test]
    fn comparisons() {
        use CompareOp::*;
        assert!(compare_values(Less, &Value::Int(1), &Value::Float(1.5)));
        assert!(compare_values(Equal, &"Bold".into(), &"bold".into()));
        assert!(compare_values(Contains, &"DejaVu Sans".into(), &"sans".into()));
        assert!(!compare_values(Equal, &Value::Int(1), &"1".into()));
        assert!(compare_values(NotEqual, &Value::Int(1), &"1".into()));

        let langs = Value::LangSet(LangSet::from_tags(["en", "fr"]));
        assert!(compare_values(Contains, &langs, &"en-gb".into()));
        assert!(!compare_values(Contains, &langs, &"de".into()));

        let latin = Value::Charset(Charset::from_ranges([(0x20, 0x7e)]));
        let digits = Value::Charset(Charset::from_ranges([(0x30, 0x39)]));
        assert!(compare_values(Contains, &latin, &digits));
        assert!(compare_values(Less, &digits, &latin));

        let r = Value::Range(Range::new(100.0, 200.0));
        assert!(compare_values(Contains, &r, &Value::Int(150)));
        assert!(compare_values(More, &Value::Int(250), &r));
    }
}
