//! Sample record synthesis for mock screens.
//!
//! Output is deterministic so regenerated examples do not churn saved files.

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};

use crate::models::{Entity, EntityField, ExampleRecord, FieldType, Project};

/// Number of records generated per entity when none is given
pub const DEFAULT_EXAMPLE_COUNT: usize = 3;

fn sample_value(entity: &Entity, field: &EntityField, index: usize) -> Value {
    let n = index + 1;
    match field.field_type {
        FieldType::Text => json!(format!("{} {} {}", entity.name, field.name, n)),
        FieldType::Email => json!(format!(
            "{}{}@example.com",
            entity.name.to_lowercase().replace(' ', "."),
            n
        )),
        FieldType::Number => {
            let validation = field.validation.as_ref();
            let min = validation.and_then(|v| v.min).unwrap_or(1.0);
            let max = validation.and_then(|v| v.max).unwrap_or(min + 100.0);
            let step = ((max - min) / 10.0).max(1.0);
            json!((min + step * index as f64).min(max))
        }
        FieldType::Date => NaiveDate::from_ymd_opt(2024, 1, 1)
            .map(|base| base + Duration::days(7 * index as i64))
            .map(|date| json!(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        FieldType::Boolean => json!(index % 2 == 0),
        FieldType::Select => match field.options() {
            [] => Value::Null,
            options => json!(options[index % options.len()]),
        },
        FieldType::Textarea => json!(format!(
            "Sample {} for {} #{}.",
            field.name, entity.name, n
        )),
    }
}

/// Generates `count` sample records for the entity's live fields
pub fn generate_examples(entity: &Entity, count: usize) -> Vec<ExampleRecord> {
    (0..count)
        .map(|index| {
            entity
                .fields
                .iter()
                .filter(|f| !f.is_removed)
                .map(|f| (f.name.clone(), sample_value(entity, f, index)))
                .collect()
        })
        .collect()
}

/// Rewrites every entity's example cache
pub fn refresh_examples(project: &mut Project, count: usize) {
    for entity in &mut project.entities {
        entity.examples = generate_examples(entity, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValidation;

    fn product() -> Entity {
        let mut size = EntityField::new("size", FieldType::Select);
        size.validation = Some(FieldValidation {
            options: Some(vec!["S".to_string(), "M".to_string()]),
            ..Default::default()
        });
        let mut price = EntityField::new("price", FieldType::Number);
        price.validation = Some(FieldValidation {
            min: Some(10.0),
            max: Some(20.0),
            ..Default::default()
        });
        Entity::new("Product")
            .with_field(EntityField::new("title", FieldType::Text))
            .with_field(EntityField::new("contact", FieldType::Email))
            .with_field(price)
            .with_field(EntityField::new("released", FieldType::Date))
            .with_field(EntityField::new("active", FieldType::Boolean))
            .with_field(size)
            .with_field(EntityField::new("notes", FieldType::Textarea))
    }

    #[test]
    fn test_generate_examples_per_type() {
        let examples = generate_examples(&product(), 3);
        assert_eq!(examples.len(), 3);

        let first = &examples[0];
        assert_eq!(first["title"], "Product title 1");
        assert_eq!(first["contact"], "product1@example.com");
        assert_eq!(first["price"], 10.0);
        assert_eq!(first["released"], "2024-01-01");
        assert_eq!(first["active"], true);
        assert_eq!(first["size"], "S");
        assert_eq!(first["notes"], "Sample notes for Product #1.");

        let third = &examples[2];
        assert_eq!(third["released"], "2024-01-15");
        assert_eq!(third["size"], "S");
        assert_eq!(examples[1]["size"], "M");
        assert_eq!(examples[1]["active"], false);
    }

    #[test]
    fn test_number_stays_within_max() {
        let examples = generate_examples(&product(), 20);
        for record in &examples {
            let price = record["price"].as_f64().unwrap();
            assert!((10.0..=20.0).contains(&price));
        }
    }

    #[test]
    fn test_select_without_options_is_null() {
        let entity = Entity::new("Thing").with_field(EntityField::new("kind", FieldType::Select));
        let examples = generate_examples(&entity, 1);
        assert!(examples[0]["kind"].is_null());
    }

    #[test]
    fn test_refresh_examples_skips_removed_fields() {
        let mut project = Project::new("Shop", "", "alice");
        let mut entity = product();
        entity.fields[0].is_removed = true;
        project.entities.push(entity);

        refresh_examples(&mut project, 2);
        let examples = &project.entities[0].examples;
        assert_eq!(examples.len(), 2);
        assert!(!examples[0].contains_key("title"));
    }
}
