use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

/// Assembles a partial-update `SET` expression from the fields a request
/// actually carried, with every attribute name aliased so reserved words
/// (`like`, `views`, ...) never reach the expression parser.
#[derive(Debug, Default)]
pub struct UpdateExpr {
    assignments: Vec<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpr {
    pub fn set(&mut self, field: &str, value: AttributeValue) -> &mut Self {
        let name = format!("#{field}");
        let placeholder = format!(":{field}");
        self.assignments.push(format!("{name} = {placeholder}"));
        self.names.insert(name, field.to_string());
        self.values.insert(placeholder, value);
        self
    }

    pub fn set_opt(&mut self, field: &str, value: Option<AttributeValue>) -> &mut Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn into_parts(self) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
        (
            format!("SET {}", self.assignments.join(", ")),
            self.names,
            self.values,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_aliased_set_expression() {
        let mut expr = UpdateExpr::default();
        expr.set("description", AttributeValue::S("hi".into()))
            .set("star", AttributeValue::N("3".into()))
            .set_opt("rune", None);

        assert!(!expr.is_empty());
        let (expression, names, values) = expr.into_parts();

        assert_eq!(expression, "SET #description = :description, #star = :star");
        assert_eq!(names.get("#star").unwrap(), "star");
        assert!(values.contains_key(":description"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn empty_patch_produces_no_assignments() {
        let mut expr = UpdateExpr::default();
        expr.set_opt("display", None);
        assert!(expr.is_empty());
    }
}
