use serde::{Deserialize, Serialize};

use super::expr::{compare_values, CompareOp, EvalContext, Expr, Qualifier};
use super::object::Object;
use super::pattern::Pattern;
use super::value::{Binding, ValueElt, ValueList};

/// The stage a rule applies to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum MatchKind {
    /// Query patterns, before matching.
    Pattern,
    /// Match results, with the query available.
    Font,
    /// Candidate patterns, when they join the pool.
    Scan,
}

/// Which values of a multi-valued object a test considers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum TestQual {
    #[default]
    Any,
    All,
    First,
    NotFirst,
    Last,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Test {
    pub qualifier: Qualifier,
    pub qual: TestQual,
    pub object: Object,
    pub op: CompareOp,
    pub expr: Expr,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EditMode {
    Assign,
    AssignReplace,
    Prepend,
    PrependFirst,
    Append,
    AppendLast,
    Delete,
    DeleteAll,
}

impl EditMode {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "assign" => EditMode::Assign,
            "assign_replace" => EditMode::AssignReplace,
            "prepend" => EditMode::Prepend,
            "prepend_first" => EditMode::PrependFirst,
            "append" => EditMode::Append,
            "append_last" => EditMode::AppendLast,
            "delete" => EditMode::Delete,
            "delete_all" => EditMode::DeleteAll,
            _ => return None,
        })
    }

    /// The whole-list variant used when no test matched a value.
    fn unanchored(self) -> Self {
        match self {
            EditMode::Assign => EditMode::AssignReplace,
            EditMode::Prepend => EditMode::PrependFirst,
            EditMode::Append => EditMode::AppendLast,
            EditMode::Delete => EditMode::DeleteAll,
            m => m,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Edit {
    pub object: Object,
    pub mode: EditMode,
    pub binding: Binding,
    pub exprs: Vec<Expr>,
}

/// A substitution rule: edits applied when every test holds.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub kind: MatchKind,
    pub tests: Vec<Test>,
    pub edits: Vec<Edit>,
}

fn context<'a>(kind: MatchKind, target: &'a Pattern, query: Option<&'a Pattern>) -> EvalContext<'a> {
    match kind {
        MatchKind::Pattern => EvalContext {
            target,
            query: Some(target),
            font: None,
        },
        MatchKind::Font => EvalContext {
            target,
            query,
            font: Some(target),
        },
        MatchKind::Scan => EvalContext {
            target,
            query: None,
            font: Some(target),
        },
    }
}

/// Runs a test, returning the index of the matched value.
///
/// `Some(None)` is a success without a matched value.
fn run_test(test: &Test, ctx: &EvalContext) -> Option<Option<usize>> {
    let Some(tested) = (match test.qualifier {
        Qualifier::Default => Some(ctx.target),
        Qualifier::Pattern => ctx.query,
        Qualifier::Font => ctx.font,
    }) else {
        return None;
    };

    let values = tested.values(test.object);
    if values.is_empty() {
        return (test.qual == TestQual::All).then_some(None);
    }

    let expected = test.expr.eval(ctx)?;
    let holds = |i: usize| compare_values(test.op, &values[i].value, &expected);

    let found = match test.qual {
        TestQual::Any => (0..values.len()).find(|&i| holds(i)),
        TestQual::All => (0..values.len()).all(holds).then_some(0),
        TestQual::First => holds(0).then_some(0),
        TestQual::NotFirst => (1..values.len()).find(|&i| holds(i)),
        TestQual::Last => {
            let last = values.len() - 1;
            holds(last).then_some(last)
        }
    }?;

    // Edits may only anchor on values of the pattern they modify.
    if std::ptr::eq(tested, ctx.target) {
        Some(Some(found))
    } else {
        Some(None)
    }
}

impl Rule {
    /// Applies the rule to `target`, returning whether it fired.
    ///
    /// `query` is the original request when running in the font stage.
    pub fn apply(&self, target: &mut Pattern, query: Option<&Pattern>) -> bool {
        let mut anchors: Vec<(Object, Option<usize>)> = Vec::new();
        {
            let ctx = context(self.kind, target, query);
            for test in &self.tests {
                let Some(anchor) = run_test(test, &ctx) else {
                    return false;
                };
                set_anchor(&mut anchors, test.object, anchor);
            }
        }

        for edit in &self.edits {
            let anchor = anchors
                .iter()
                .find(|(o, _)| *o == edit.object)
                .and_then(|(_, a)| *a);

            let new_anchor = self.apply_edit(edit, anchor, target, query);
            set_anchor(&mut anchors, edit.object, new_anchor);
        }

        true
    }

    fn apply_edit(
        &self,
        edit: &Edit,
        anchor: Option<usize>,
        target: &mut Pattern,
        query: Option<&Pattern>,
    ) -> Option<usize> {
        let binding = match edit.binding {
            Binding::Same => anchor
                .and_then(|i| target.values(edit.object).get(i))
                .map_or(Binding::Strong, |elt| elt.binding),
            b => b,
        };

        let values: ValueList = {
            let ctx = context(self.kind, target, query);
            edit.exprs
                .iter()
                .filter_map(|e| e.eval(&ctx))
                .map(|v| ValueElt::new(v, binding))
                .collect()
        };

        let mode = if anchor.is_some() { edit.mode } else { edit.mode.unanchored() };
        let deleting = matches!(mode, EditMode::Delete | EditMode::DeleteAll);
        if values.is_empty() && !deleting {
            log::debug!("edit of '{}' produced no value, skipped", edit.object);
            return anchor;
        }

        match (mode, anchor) {
            (EditMode::Assign, Some(i)) => {
                if target.insert_list(edit.object, Some(i), true, &values) {
                    target.remove_at(edit.object, i);
                }
                Some(i)
            }
            (EditMode::Prepend, Some(i)) => {
                target.insert_list(edit.object, Some(i), false, &values);
                Some(i + values.len())
            }
            (EditMode::Append, Some(i)) => {
                target.insert_list(edit.object, Some(i), true, &values);
                Some(i)
            }
            (EditMode::Delete, Some(i)) => {
                target.remove_at(edit.object, i);
                None
            }
            (EditMode::AssignReplace, _) => {
                if Pattern::accepts(edit.object, &values) {
                    target.del(edit.object);
                    target.add_list(edit.object, &values, true);
                }
                None
            }
            (EditMode::PrependFirst, _) => {
                target.add_list(edit.object, &values, false);
                anchor.map(|i| i + values.len())
            }
            (EditMode::AppendLast, _) => {
                target.add_list(edit.object, &values, true);
                anchor
            }
            (EditMode::DeleteAll, _) => {
                target.del(edit.object);
                None
            }
            // Anchored modes always carry an anchor here.
            (_, None) => None,
        }
    }
}

fn set_anchor(anchors: &mut Vec<(Object, Option<usize>)>, object: Object, anchor: Option<usize>) {
    match anchors.iter_mut().find(|(o, _)| *o == object) {
        Some(slot) => slot.1 = anchor,
        None => anchors.push((object, anchor)),
    }
}

/// Applies every rule of `kind` in order; later rules see earlier edits.
pub(crate) fn apply_rules(
    rules: &[Rule],
    kind: MatchKind,
    target: &mut Pattern,
    query: Option<&Pattern>,
) -> usize {
    rules
        .iter()
        .filter(|r| r.kind == kind)
        .filter(|r| r.apply(target, query))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::Value;
    use pretty_assertions::assert_eq;

    fn test(object: Object, op: CompareOp, value: impl Into<Value>) -> Test {
        Test {
            qualifier: Qualifier::Default,
            qual: TestQual::Any,
            object,
            op,
            expr: Expr::Const(value.into()),
        }
    }

    fn edit(object: Object, mode: EditMode, values: &[&str]) -> Edit {
        Edit {
            object,
            mode,
            binding: Binding::Weak,
            exprs: values.iter().map(|v| Expr::Const((*v).into())).collect(),
        }
    }

    fn families(p: &Pattern) -> Vec<&str> {
        p.strings(Object::FAMILY).collect()
    }

    fn alias_rule(mode: EditMode) -> Rule {
        Rule {
            kind: MatchKind::Pattern,
            tests: vec![test(Object::FAMILY, CompareOp::Equal, "Helvetica")],
            edits: vec![edit(Object::FAMILY, mode, &["Arial"])],
        }
    }

    fn query() -> Pattern {
        Pattern::build([
            (Object::FAMILY, "Foo".into()),
            (Object::FAMILY, "Helvetica".into()),
            (Object::FAMILY, "Bar".into()),
        ])
    }

    #[test]
    fn anchored_edits() {
        let mut p = query();
        assert!(alias_rule(EditMode::Assign).apply(&mut p, None));
        assert_eq!(families(&p), ["Foo", "Arial", "Bar"]);

        let mut p = query();
        alias_rule(EditMode::Prepend).apply(&mut p, None);
        assert_eq!(families(&p), ["Foo", "Arial", "Helvetica", "Bar"]);

        let mut p = query();
        alias_rule(EditMode::Append).apply(&mut p, None);
        assert_eq!(families(&p), ["Foo", "Helvetica", "Arial", "Bar"]);
        assert_eq!(p.values(Object::FAMILY)[2].binding, Binding::Weak);

        let mut p = query();
        alias_rule(EditMode::Delete).apply(&mut p, None);
        assert_eq!(families(&p), ["Foo", "Bar"]);
    }

    #[test]
    fn whole_list_edits() {
        let mut p = query();
        alias_rule(EditMode::AssignReplace).apply(&mut p, None);
        assert_eq!(families(&p), ["Arial"]);

        let mut p = query();
        alias_rule(EditMode::AppendLast).apply(&mut p, None);
        assert_eq!(families(&p), ["Foo", "Helvetica", "Bar", "Arial"]);

        let mut p = query();
        alias_rule(EditMode::PrependFirst).apply(&mut p, None);
        assert_eq!(families(&p), ["Arial", "Foo", "Helvetica", "Bar"]);
    }

    #[test]
    fn unanchored_edit_falls_back_to_whole_list() {
        let rule = Rule {
            kind: MatchKind::Pattern,
            tests: vec![test(Object::SLANT, CompareOp::Equal, 100)],
            edits: vec![edit(Object::FAMILY, EditMode::Prepend, &["Italic Sans"])],
        };
        let mut p = query();
        p.add(Object::SLANT, 100, true);
        assert!(rule.apply(&mut p, None));
        assert_eq!(families(&p)[0], "Italic Sans");
    }

    #[test]
    fn failing_tests_and_qualifiers() {
        let mut p = query();
        let mut rule = alias_rule(EditMode::Assign);
        rule.tests[0].qual = TestQual::First;
        assert!(!rule.apply(&mut p, None));
        assert_eq!(p, query());

        rule.tests[0].qual = TestQual::NotFirst;
        assert!(rule.apply(&mut p, None));

        let mut p = query();
        rule.tests[0].object = Object::STYLE;
        assert!(!rule.apply(&mut p, None));

        rule.tests[0].qual = TestQual::All;
        assert!(rule.apply(&mut p, None));
        assert_eq!(families(&p), ["Arial"]);
    }

    #[test]
    fn font_stage_reads_the_query() {
        let rule = Rule {
            kind: MatchKind::Font,
            tests: vec![
                Test {
                    qualifier: Qualifier::Pattern,
                    ..test(Object::WEIGHT, CompareOp::More, 150)
                },
                test(Object::WEIGHT, CompareOp::Less, 150),
            ],
            edits: vec![Edit {
                object: Object::EMBOLDEN,
                mode: EditMode::Assign,
                binding: Binding::Strong,
                exprs: vec![Expr::Const(true.into())],
            }],
        };

        let query = Pattern::build([(Object::WEIGHT, 200.into())]);
        let mut font = Pattern::build([(Object::WEIGHT, 80.into())]);
        assert!(rule.apply(&mut font, Some(&query)));
        assert_eq!(font.get_bool(Object::EMBOLDEN), Ok(true));

        let mut font = Pattern::build([(Object::WEIGHT, 80.into())]);
        assert!(!rule.apply(&mut font, None));
    }

    #[test]
    fn skipped_and_rejected_values() {
        let rule = Rule {
            kind: MatchKind::Pattern,
            tests: vec![],
            edits: vec![
                Edit {
                    object: Object::PIXEL_SIZE,
                    mode: EditMode::Assign,
                    binding: Binding::Strong,
                    exprs: vec![Expr::Field(Qualifier::Default, Object::SIZE)],
                },
                edit(Object::WEIGHT, EditMode::Assign, &["heavy"]),
            ],
        };
        let mut p = query();
        assert!(rule.apply(&mut p, None));
        assert_eq!(p, query());
    }

    #[test]
    fn rules_see_earlier_edits() {
        let rules = vec![
            alias_rule(EditMode::Assign),
            Rule {
                kind: MatchKind::Pattern,
                tests: vec![test(Object::FAMILY, CompareOp::Equal, "Arial")],
                edits: vec![edit(Object::FAMILY, EditMode::Append, &["Liberation Sans"])],
            },
            Rule {
                kind: MatchKind::Font,
                tests: vec![],
                edits: vec![edit(Object::FAMILY, EditMode::AssignReplace, &["x"])],
            },
        ];
        let mut p = query();
        assert_eq!(apply_rules(&rules, MatchKind::Pattern, &mut p, None), 2);
        assert_eq!(families(&p), ["Foo", "Arial", "Liberation Sans", "Bar"]);
    }
}
