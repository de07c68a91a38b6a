use fontweave::fc::object::{WEIGHT_BOLD, WEIGHT_MEDIUM, WEIGHT_REGULAR};
use fontweave::fc::{Binding, Config, Environment, FontSet, Object, Pattern, RuleSource, Value};
use pretty_assertions::assert_eq;

fn font(family: &str, weight: i32, file: &str) -> Pattern {
    let mut p = Pattern::new();
    p.add(Object::FAMILY, family, true);
    p.add(Object::WEIGHT, weight, true);
    p.add(Object::FILE, file, true);
    p
}

#[test]
fn default_substitution_is_idempotent() {
    let env = Environment::new("de-CH", "viewer");
    let queries = [
        Pattern::build([(Object::FAMILY, "Arial".into())]),
        Pattern::build([(Object::SIZE, 10.5.into()), (Object::DPI, 120.0.into())]),
        Pattern::build([(Object::PIXEL_SIZE, 17.0.into()), (Object::SCALE, 1.5.into())]),
    ];

    for query in queries {
        let mut once = query.clone();
        once.substitute_default(&env);
        let mut twice = once.clone();
        twice.substitute_default(&env);
        assert_eq!(once, twice);
        assert_eq!(once.hash_key(), twice.hash_key());
    }
}

#[test]
fn hash_ignores_object_order_only() {
    let mut a = Pattern::new();
    a.add(Object::FAMILY, "x", true);
    a.add(Object::STYLE, "y", true);

    let mut b = Pattern::new();
    b.add(Object::STYLE, "y", true);
    b.add(Object::FAMILY, "x", true);

    assert_eq!(a.hash_key(), b.hash_key());
    assert_eq!(a, b);

    let mut c = a.clone();
    c.add(Object::FAMILY, "z", true);
    let mut d = a.clone();
    d.add(Object::FAMILY, "z", false);
    assert_ne!(c.hash_key(), d.hash_key());
    assert_ne!(c, d);
}

#[test]
fn hash_covers_binding() {
    let mut strong = Pattern::new();
    strong.add(Object::FAMILY, "x", true);
    let mut weak = Pattern::new();
    weak.add_with_binding(Object::FAMILY, Value::from("x"), Binding::Weak, true);
    assert_ne!(strong.hash_key(), weak.hash_key());
}

#[test]
fn closest_weight_wins() {
    let mut config = Config::new();
    config.add_font(font("Arial", WEIGHT_BOLD, "arialbd.ttf"));
    config.add_font(font("Arial", WEIGHT_MEDIUM, "arialmd.ttf"));

    let mut query = Pattern::new();
    query.add(Object::FAMILY, "Arial", true);
    query.add(Object::SIZE, 12, true);
    config.substitute(&mut query);
    query.substitute_default(&Environment::default());
    assert_eq!(query.get_float(Object::WEIGHT), Ok(f64::from(WEIGHT_REGULAR)));

    let found = config.font_match(&query).unwrap();
    assert_eq!(found.get_string(Object::FILE), Ok("arialmd.ttf"));
    assert_eq!(found.get_float(Object::WEIGHT), Ok(f64::from(WEIGHT_MEDIUM)));
}

#[test]
fn appending_keeps_relative_order() {
    let mut pool: FontSet = [
        font("Noto Sans", 80, "a"),
        font("DejaVu Sans", 200, "b"),
        font("Noto Sans", 200, "c"),
        font("Liberation Sans", 80, "d"),
    ]
    .into_iter()
    .collect();

    let mut query = Pattern::new();
    query.add(Object::FAMILY, "Noto Sans", true);
    query.add(Object::FAMILY, "Liberation Sans", true);
    query.add(Object::WEIGHT, 180, true);

    let before = pool.sort(&query, false).order;
    assert_eq!(before, vec![2, 0, 3, 1]);

    pool.add(font("Noto Sans", 180, "e"));
    let after: Vec<usize> = pool
        .sort(&query, false)
        .order
        .into_iter()
        .filter(|i| *i != 4)
        .collect();
    assert_eq!(after, before);
}

#[test]
fn equal_candidates_keep_pool_order() {
    let pool: FontSet = (0..5)
        .map(|i| font("Cantarell", 80, &format!("cantarell-{}.otf", i)))
        .collect();
    let query = Pattern::build([(Object::FAMILY, "Cantarell".into())]);
    assert_eq!(pool.sort(&query, false).order, vec![0, 1, 2, 3, 4]);
    assert_eq!(pool.best_match(&query), Some(0));
}

#[test]
fn snapshot_round_trip() {
    let source = RuleSource::new(
        "aliases.conf",
        r#"
        match pattern {
            test family == "Helvetica";
            edit family assign strong "Arial";
            edit weight assign weight + 20;
        }
        "#,
    );
    let mut config = Config::load(&[source]).unwrap();

    let mut candidate = font("Arial", WEIGHT_MEDIUM, "arial.ttf");
    candidate.add(Object::PIXEL_SIZE, 12.5, true);
    candidate.add(Object::LANG, "my", true);
    config.add_font(candidate.clone());

    let json = config.to_json().unwrap();
    let restored = Config::from_json(&json).unwrap();
    assert_eq!(restored, config);
    assert_eq!(restored.fonts().get(0), Some(&candidate));
    assert_eq!(restored.rules(), config.rules());
}

#[test]
fn loaded_rules_rewrite_queries() {
    let source = RuleSource::new(
        "aliases.conf",
        r#"
        match pattern {
            test family == "Helvetica";
            edit family assign strong "Arial";
        }
        "#,
    );
    let mut config = Config::load(&[source]).unwrap();
    config.add_font(font("Helvetica Neue", WEIGHT_REGULAR, "hn.ttf"));
    config.add_font(font("Arial", WEIGHT_REGULAR, "arial.ttf"));

    let mut query = Pattern::build([(Object::FAMILY, "Helvetica".into())]);
    config.substitute(&mut query);
    assert_eq!(query.get_string(Object::FAMILY), Ok("Arial"));

    let found = config.font_match(&query).unwrap();
    assert_eq!(found.get_string(Object::FILE), Ok("arial.ttf"));
}
