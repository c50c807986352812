//! Deterministic identifier transforms.
//!
//! Pluralization and singularization handle a fixed irregulars table first
//! and fall back to the `inflector` crate, so table↔model round-trips are
//! stable across runs. Inflection always applies to the final snake-case
//! segment only (`meta_data` → `meta_datum`).

use inflector::Inflector;

/// Irregular plurals that matter in database schemas. Checked before the
/// rule-based fallback in both directions.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("self", "selves"),
    ("calf", "calves"),
    ("loaf", "loaves"),
    ("potato", "potatoes"),
    ("tomato", "tomatoes"),
    ("hero", "heroes"),
    ("analysis", "analyses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("diagnosis", "diagnoses"),
    ("hypothesis", "hypotheses"),
    ("thesis", "theses"),
    ("phenomenon", "phenomena"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("appendix", "appendices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }
    word.to_plural()
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }
    word.to_singular()
}

/// Split off the final `_` segment so inflection leaves prefixes untouched.
fn split_last_segment(name: &str) -> (&str, &str) {
    match name.rfind('_') {
        Some(pos) => (&name[..=pos], &name[pos + 1..]),
        None => ("", name),
    }
}

/// Pluralize the last segment of a snake-case identifier.
pub fn pluralize(name: &str) -> String {
    let (prefix, last) = split_last_segment(name);
    format!("{}{}", prefix, pluralize_word(last))
}

/// Singularize the last segment of a snake-case identifier.
pub fn singularize(name: &str) -> String {
    let (prefix, last) = split_last_segment(name);
    format!("{}{}", prefix, singularize_word(last))
}

pub fn snake_case(name: &str) -> String {
    name.to_snake_case()
}

pub fn camel_case(name: &str) -> String {
    name.to_camel_case()
}

pub fn studly_case(name: &str) -> String {
    name.to_pascal_case()
}

/// Table name → class name: singularize, then studly.
/// `meta_data` maps to `MetaDatum` — a known non-inverse the port keeps.
pub fn table_to_model(table: &str) -> String {
    studly_case(&singularize(table))
}

/// Class name → table name: snake, then pluralize.
pub fn model_to_table(model: &str) -> String {
    pluralize(&snake_case(model))
}

/// FK column → relation method name: strip the conventional key suffix,
/// then camel-case. `author_id` → `author`, `parent_company_id` → `parentCompany`.
pub fn relation_name_from_fk(column: &str) -> String {
    let stripped = column
        .strip_suffix("_id")
        .or_else(|| column.strip_suffix("_uuid"))
        .or_else(|| column.strip_suffix("_key"))
        .unwrap_or(column);
    camel_case(stripped)
}

/// The conventional FK column for a referenced table: `users` → `user_id`.
pub fn conventional_fk(table: &str) -> String {
    format!("{}_id", singularize(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_regular() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("key"), "keys");
    }

    #[test]
    fn test_pluralize_irregular() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("goose"), "geese");
        assert_eq!(pluralize("datum"), "data");
    }

    #[test]
    fn test_pluralize_already_plural() {
        assert_eq!(pluralize("users"), "users");
        assert_eq!(pluralize("people"), "people");
    }

    #[test]
    fn test_pluralize_only_last_segment() {
        assert_eq!(pluralize("user_role"), "user_roles");
        assert_eq!(pluralize("order_item"), "order_items");
    }

    #[test]
    fn test_singularize_regular() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
    }

    #[test]
    fn test_singularize_irregular() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("geese"), "goose");
        assert_eq!(singularize("data"), "datum");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(snake_case("BlogPost"), "blog_post");
        assert_eq!(camel_case("blog_post"), "blogPost");
        assert_eq!(studly_case("blog_post"), "BlogPost");
    }

    #[test]
    fn test_table_to_model() {
        assert_eq!(table_to_model("users"), "User");
        assert_eq!(table_to_model("blog_posts"), "BlogPost");
        assert_eq!(table_to_model("people"), "Person");
        assert_eq!(table_to_model("categories"), "Category");
    }

    // The known open case: `meta_data` classifies as a plural of `meta_datum`.
    #[test]
    fn test_table_to_model_meta_data_open_case() {
        assert_eq!(table_to_model("meta_data"), "MetaDatum");
        assert_eq!(model_to_table("MetaDatum"), "meta_data");
    }

    #[test]
    fn test_model_to_table() {
        assert_eq!(model_to_table("User"), "users");
        assert_eq!(model_to_table("BlogPost"), "blog_posts");
        assert_eq!(model_to_table("Person"), "people");
    }

    #[test]
    fn test_model_table_roundtrip() {
        for model in ["User", "BlogPost", "Person", "Category", "Address"] {
            let table = model_to_table(model);
            assert_eq!(table_to_model(&table), model, "round-trip failed for {model}");
        }
    }

    #[test]
    fn test_relation_name_from_fk() {
        assert_eq!(relation_name_from_fk("user_id"), "user");
        assert_eq!(relation_name_from_fk("author_id"), "author");
        assert_eq!(relation_name_from_fk("parent_company_id"), "parentCompany");
        assert_eq!(relation_name_from_fk("owner_uuid"), "owner");
        assert_eq!(relation_name_from_fk("tenant_key"), "tenant");
        // no conventional suffix: used as-is
        assert_eq!(relation_name_from_fk("creator"), "creator");
    }

    #[test]
    fn test_conventional_fk() {
        assert_eq!(conventional_fk("users"), "user_id");
        assert_eq!(conventional_fk("people"), "person_id");
        assert_eq!(conventional_fk("blog_posts"), "blog_post_id");
    }
}
