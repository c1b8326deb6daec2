//! Minimal model of the parts of a page the agent inspects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    /// Lower-cased `type` attribute; `text` when absent.
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub autocomplete: Option<String>,
}

fn default_input_type() -> String {
    "text".to_string()
}

impl InputField {
    pub fn new(input_type: &str, name: Option<&str>) -> Self {
        Self {
            input_type: input_type.to_ascii_lowercase(),
            name: name.map(str::to_string),
            autocomplete: None,
        }
    }

    pub fn is_password(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("password")
    }

    pub fn is_hidden(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("hidden")
    }

    /// Email or username entry.
    pub fn is_identity(&self) -> bool {
        if self.input_type.eq_ignore_ascii_case("email") {
            return true;
        }
        let hint = |s: &Option<String>| {
            s.as_deref()
                .map(|v| {
                    let v = v.to_ascii_lowercase();
                    v.contains("email") || v.contains("user") || v.contains("login")
                })
                .unwrap_or(false)
        };
        self.input_type.eq_ignore_ascii_case("text") && (hint(&self.name) || hint(&self.autocomplete))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormElement {
    #[serde(default)]
    pub id: Option<String>,
    /// Raw `action` attribute, resolved against the page URL when scanned.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputField>,
    /// Inline event handler sources (`onsubmit`, `onclick` on the form or its buttons).
    #[serde(default)]
    pub handlers: Vec<String>,
}

impl FormElement {
    /// Identity across snapshots: the id if present, else method, action and
    /// the sorted input fields. Independent of where the form sits in the page.
    pub fn key(&self) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return format!("#{}", id);
        }
        let method = self.method.as_deref().unwrap_or("get").trim().to_ascii_lowercase();
        let mut fields: Vec<String> = self
            .inputs
            .iter()
            .map(|i| format!("{}:{}", i.input_type, i.name.as_deref().unwrap_or("")))
            .collect();
        fields.sort();
        format!("{} {} [{}]", method, self.action.as_deref().unwrap_or("").trim(), fields.join(","))
    }

    pub fn has_password(&self) -> bool {
        self.inputs.iter().any(InputField::is_password)
    }

    /// Forms worth scanning: anything asking for a password, email or username.
    pub fn collects_credentials(&self) -> bool {
        self.inputs.iter().any(|i| i.is_password() || i.is_identity())
    }

    pub fn method_is_get(&self) -> bool {
        self.method
            .as_deref()
            .map(|m| m.trim().eq_ignore_ascii_case("get"))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub forms: Vec<FormElement>,
    /// `src` attributes of script elements.
    #[serde(default)]
    pub scripts: Vec<String>,
}

/// What the page reports to its agent.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Document finished loading
    Ready(PageSnapshot),
    /// DOM changed after load
    Mutated(PageSnapshot),
    /// User attempted to submit a form
    Submit { form_index: usize },
    /// User chose "proceed anyway" on the warning page
    ProceedAnyway,
    Unload,
}
