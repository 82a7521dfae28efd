use serde_json::Value;
use tracing::{debug, error};
use unicode_width::UnicodeWidthChar;

use crate::{
    domain::{Choice, ChoicesSpec},
    form::SubDocument,
};

use super::{host::ChoiceSource, session::ArraySession};

const LABEL_MAX_WIDTH: usize = 48;

/// A working-set item paired with the label shown in the list UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledItem<'a> {
    pub item: &'a SubDocument,
    pub label: String,
}

/// Counts shown next to the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSummary {
    pub count: usize,
    /// Effective minimum, omitted when zero.
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub maxed: bool,
}

impl<H> ArraySession<H> {
    /// List label for `item`: the title field (through its choice labels when it is a
    /// select), else the `title` field, else the 1-based position.
    pub fn label(&self, item: &SubDocument) -> String {
        let candidate = match self.field.title_field.as_deref() {
            Some(path) => item.get_path(path).map(|value| self.choice_label(value)),
            None if self.schema.iter().any(|field| field.name == "title") => {
                item.get("title").map(display_value)
            }
            None => None,
        };
        match candidate.filter(|text| !text.is_empty()) {
            Some(text) => truncate_to_width(&text, LABEL_MAX_WIDTH),
            None => self
                .next
                .position(item.id())
                .map(|index| format!("#{}", index + 1))
                .unwrap_or_default(),
        }
    }

    pub fn with_labels(&self) -> Vec<LabeledItem<'_>> {
        self.next
            .iter()
            .map(|item| LabeledItem {
                item,
                label: self.label(item),
            })
            .collect()
    }

    pub fn count_summary(&self) -> CountSummary {
        let constraints = self.constraints();
        let count = self.next.len();
        CountSummary {
            count,
            min: (constraints.min > 0).then_some(constraints.min),
            max: constraints.max,
            maxed: constraints.max.is_some_and(|max| count >= max),
        }
    }

    pub fn title_field_choices(&self) -> Option<&[Choice]> {
        self.title_choices.as_deref()
    }

    /// Resolves choice labels for the title field. Method-backed choices go through
    /// `source`; a failed fetch is logged and the plain value labels stay in place.
    pub fn load_title_choices(&mut self, source: &mut dyn ChoiceSource) {
        self.title_choices = self.fetch_title_choices(source);
    }

    fn fetch_title_choices(&self, source: &mut dyn ChoiceSource) -> Option<Vec<Choice>> {
        let name = self.field.title_field.as_deref()?;
        let field = self.schema.iter().find(|field| field.name == name)?;
        match field.choices.as_ref()? {
            ChoicesSpec::Static(choices) => Some(choices.clone()),
            ChoicesSpec::Method(method) => {
                let Some(field_id) = field.id.as_deref() else {
                    debug!(field = %field.name, method = %method, "title field has no id; skipping choice fetch");
                    return None;
                };
                match source.fetch_choices(field_id) {
                    Ok(choices) => Some(choices),
                    Err(err) => {
                        error!(field = %field.name, error = %err, "failed to fetch title field choices");
                        None
                    }
                }
            }
        }
    }

    fn choice_label(&self, value: &Value) -> String {
        self.title_choices
            .as_ref()
            .and_then(|choices| choices.iter().find(|choice| &choice.value == value))
            .and_then(|choice| choice.label.clone())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| display_value(value))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            out.push('…');
            return out;
        }
        width += ch_width;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use serde_json::json;

    use super::*;
    use crate::{
        app::{host::NullHost, options::SessionOptions},
        domain::SessionInput,
    };

    struct FixedChoices(Result<Vec<Choice>, String>, usize);

    impl ChoiceSource for FixedChoices {
        fn fetch_choices(&mut self, _field_id: &str) -> Result<Vec<Choice>> {
            self.1 += 1;
            self.0.clone().map_err(|message| anyhow!(message))
        }
    }

    fn session(value: serde_json::Value) -> ArraySession<NullHost> {
        let input: SessionInput = serde_json::from_value(value).expect("input");
        ArraySession::new(input, SessionOptions::default(), NullHost)
    }

    fn labels(session: &ArraySession<NullHost>) -> Vec<String> {
        session
            .with_labels()
            .into_iter()
            .map(|entry| entry.label)
            .collect()
    }

    #[test]
    fn falls_back_to_title_then_position() {
        let s = session(json!({
            "items": [{"_id": "a", "title": "First"}, {"_id": "b", "title": ""}],
            "field": {"schema": [{"name": "title", "type": "string"}]}
        }));
        assert_eq!(labels(&s), vec!["First", "#2"]);
    }

    #[test]
    fn title_is_ignored_when_not_declared() {
        let s = session(json!({
            "items": [{"_id": "a", "title": "First"}],
            "field": {"schema": [{"name": "name", "type": "string"}]}
        }));
        assert_eq!(labels(&s), vec!["#1"]);
    }

    #[test]
    fn static_choices_prettify_title_field() {
        let mut s = session(json!({
            "items": [{"_id": "a", "color": "r"}, {"_id": "b", "color": "x"}],
            "field": {
                "titleField": "color",
                "schema": [{"name": "color", "type": "select", "choices": [
                    {"value": "r", "label": "Red"}
                ]}]
            }
        }));
        let mut source = FixedChoices(Ok(Vec::new()), 0);
        s.load_title_choices(&mut source);
        assert_eq!(source.1, 0, "static choices need no fetch");
        assert_eq!(labels(&s), vec!["Red", "x"]);
    }

    #[test]
    fn failed_choice_fetch_keeps_value_labels() {
        let mut s = session(json!({
            "items": [{"_id": "a", "color": "r"}],
            "field": {
                "titleField": "color",
                "schema": [{"_id": "f1", "name": "color", "type": "select", "choices": "getColors"}]
            }
        }));
        let mut source = FixedChoices(Err("offline".to_string()), 0);
        s.load_title_choices(&mut source);
        assert_eq!(source.1, 1);
        assert!(s.title_field_choices().is_none());
        assert_eq!(labels(&s), vec!["r"]);

        let mut online = FixedChoices(
            Ok(vec![Choice {
                value: json!("r"),
                label: Some("Rouge".into()),
            }]),
            0,
        );
        s.load_title_choices(&mut online);
        assert_eq!(labels(&s), vec!["Rouge"]);
    }

    #[test]
    fn count_summary_reports_effective_bounds() {
        let s = session(json!({
            "items": [{"_id": "a"}, {"_id": "b"}],
            "field": {"required": true, "max": 2}
        }));
        assert_eq!(
            s.count_summary(),
            CountSummary {
                count: 2,
                min: Some(1),
                max: Some(2),
                maxed: true
            }
        );
    }

    #[test]
    fn long_labels_are_truncated_by_display_width() {
        let text = "宽".repeat(30);
        let truncated = truncate_to_width(&text, 10);
        assert_eq!(truncated, format!("{}…", "宽".repeat(5)));
        assert_eq!(truncate_to_width("short", 10), "short");
    }
}
