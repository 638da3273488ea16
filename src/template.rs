use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// An HTML page with `{{...}}` markers, filled in by plain string replacement.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    file: String,
}

/// Everything a page needs, applied in a fixed order: variables, then
/// lists, then checklists.
#[derive(Debug, Default)]
pub struct Bindings {
    variables: Vec<(String, String)>,
    lists: Vec<(String, Vec<String>)>,
    checklists: Vec<(String, Vec<String>)>,
}

impl TemplateFile {
    pub fn open(path: &Path) -> Result<Self, io::Error> {
        fs::read_to_string(path).map(Self::from)
    }

    /// `{{name}}` becomes `value`.
    pub fn variable(mut self, name: &str, value: &str) -> Self {
        self.file = self.file.replace(&format!("{{{{{name}}}}}"), value);
        self
    }

    /// `{{ulist name}}` and `{{olist name}}` become `<ul>`/`<ol>` lists.
    pub fn list<S: AsRef<str>>(mut self, name: &str, items: &[S]) -> Self {
        let elements = items
            .iter()
            .map(|item| format!("<li>{}</li>\n", item.as_ref()))
            .collect::<String>();

        self.file = self
            .file
            .replace(
                &format!("{{{{ulist {name}}}}}"),
                &format!("<ul id='{name}'>\n{elements}</ul>\n"),
            )
            .replace(
                &format!("{{{{olist {name}}}}}"),
                &format!("<ol id='{name}'>\n{elements}</ol>\n"),
            );
        self
    }

    /// `{{checklist name}}` becomes a fieldset of checkboxes, one per item.
    pub fn checklist<S: AsRef<str>>(mut self, name: &str, items: &[S]) -> Self {
        let elements = items
            .iter()
            .map(|item| {
                let item = item.as_ref();
                let id = item.replace(' ', "-");
                format!(
                    "<input type='checkbox' name='{id}' id='{id}' /><label for='{id}'>{item}</label>\n"
                )
            })
            .collect::<String>();

        self.file = self.file.replace(
            &format!("{{{{checklist {name}}}}}"),
            &format!("<fieldset name='{name}'>\n{elements}</fieldset>\n"),
        );
        self
    }

    pub fn render(self, bindings: &Bindings) -> Self {
        let page = bindings
            .variables
            .iter()
            .fold(self, |page, (name, value)| page.variable(name, value));

        let page = bindings
            .lists
            .iter()
            .fold(page, |page, (name, items)| page.list(name, items));

        bindings
            .checklists
            .iter()
            .fold(page, |page, (name, items)| page.checklist(name, items))
    }

    pub fn into_string(self) -> String {
        self.file
    }
}

impl From<String> for TemplateFile {
    fn from(file: String) -> Self {
        Self { file }
    }
}

impl fmt::Display for TemplateFile {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.file)
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    pub fn list(mut self, name: &str, items: Vec<String>) -> Self {
        self.lists.push((name.into(), items));
        self
    }

    pub fn checklist(mut self, name: &str, items: Vec<String>) -> Self {
        self.checklists.push((name.into(), items));
        self
    }
}
