//! Uniform value wrapper
//!
//! Every assertion operates on a [`Value`], whatever produced it: a status
//! code, a JSON subtree, or an element handle from a document backend.
//! Projections never mutate the source; they return a new `Value` whose
//! name describes the projection and which keeps a link to its parent.

pub mod element;
mod projection;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::common::{Error, Result};

pub use element::{Element, ElementRef};
pub use projection::natural_cmp;

/// Underlying data held by a [`Value`]
#[derive(Clone)]
pub enum Data {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Data>),
    Object(BTreeMap<String, Data>),
    Element(ElementRef),
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Object(map) => f.debug_map().entries(map).finish(),
            Self::Element(el) => write!(f, "{}", el.describe()),
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Render a number without a trailing `.0` for whole values
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl Data {
    /// Type name used in messages and `is_type` assertions
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Element(_) => "element",
        }
    }

    /// String form of the data
    pub fn to_text(&self) -> String {
        match self {
            Self::Undefined | Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(Data::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => self.to_json().to_string(),
            Self::Element(el) => el.describe(),
        }
    }

    /// Numeric form, `NaN` when the data has no numeric reading
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Truthiness
    pub fn to_bool(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Element(_) => true,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Data::to_json).collect()),
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Element(el) => serde_json::Value::String(el.describe()),
        }
    }

    /// Length of a collection-like value (array items, string chars, object keys)
    pub fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::String(s) => s.chars().count(),
            Self::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index` of an array or string; negative indexes count from the end
    fn item(&self, index: isize) -> Data {
        let len = self.len() as isize;
        let index = if index < 0 { len + index } else { index };
        if index < 0 || index >= len {
            return Data::Undefined;
        }
        match self {
            Self::Array(items) => items[index as usize].clone(),
            Self::String(s) => s
                .chars()
                .nth(index as usize)
                .map(|c| Data::String(c.to_string()))
                .unwrap_or(Data::Undefined),
            _ => Data::Undefined,
        }
    }

    fn field(&self, key: &str) -> Data {
        match self {
            Self::Object(map) => map.get(key).cloned().unwrap_or(Data::Undefined),
            Self::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Data::Undefined),
            _ => Data::Undefined,
        }
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Data::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Data::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Data {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Data {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Data {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u16> for Data {
    fn from(n: u16) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<usize> for Data {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<ElementRef> for Data {
    fn from(el: ElementRef) -> Self {
        Self::Element(el)
    }
}

impl<T: Into<Data>> From<Vec<T>> for Data {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Data::Null)
    }
}

/// A named wrapper around [`Data`]
#[derive(Clone, Debug)]
pub struct Value {
    data: Data,
    name: String,
    parent: Option<Arc<Value>>,
    highlight: Option<String>,
    source: Option<Arc<str>>,
}

impl Default for Value {
    fn default() -> Self {
        Self::undefined()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.to_text())
    }
}

impl Value {
    pub fn new(data: impl Into<Data>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            parent: None,
            highlight: None,
            source: None,
        }
    }

    pub fn undefined() -> Self {
        Self::new(Data::Undefined, "undefined")
    }

    /// Create a value derived from this one by a projection
    ///
    /// The child keeps a link to `self` and inherits its source document.
    pub fn derive(&self, data: impl Into<Data>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            parent: Some(Arc::new(self.clone())),
            highlight: None,
            source: self.source.clone(),
        }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_deref()
    }

    /// Literal substring of the source document this value maps to
    pub fn highlight(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    /// Source document text this value was taken from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Same data under a new name
    pub fn rename(&self, name: impl Into<String>) -> Self {
        let mut renamed = self.clone();
        renamed.name = name.into();
        renamed
    }

    pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
        self.highlight = Some(highlight.into());
        self
    }

    pub fn with_source(mut self, source: Arc<str>) -> Self {
        self.source = Some(source);
        self
    }

    /// Names from the root value down to this one, joined for trace output
    pub fn trace(&self) -> String {
        let mut names = vec![self.name.as_str()];
        let mut current = self.parent();
        while let Some(parent) = current {
            names.push(parent.name());
            current = parent.parent();
        }
        names.reverse();
        names.join(" -> ")
    }

    // === Introspection ===

    pub fn type_name(&self) -> &'static str {
        self.data.type_name()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.data, Data::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    pub fn is_null_or_undefined(&self) -> bool {
        self.is_null() || self.is_undefined()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.data, Data::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.data, Data::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.data, Data::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.data, Data::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.data, Data::Object(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, Data::Element(_))
    }

    // === Coercions ===

    pub fn to_text(&self) -> String {
        self.data.to_text()
    }

    pub fn to_number(&self) -> f64 {
        self.data.to_number()
    }

    pub fn to_bool(&self) -> bool {
        self.data.to_bool()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.data.to_json()
    }

    /// Items as individual values; scalars become a one-item list
    pub fn to_array(&self) -> Vec<Value> {
        match &self.data {
            Data::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.derive(item.clone(), format!("{}[{}]", self.name, i)))
                .collect(),
            Data::Undefined | Data::Null => Vec::new(),
            other => vec![self.derive(other.clone(), self.name.clone())],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // === Projections ===

    pub fn nth(&self, index: isize) -> Value {
        self.derive(self.data.item(index), format!("[{}] in {}", index, self.name))
    }

    pub fn first(&self) -> Value {
        self.derive(self.data.item(0), format!("First in {}", self.name))
    }

    pub fn last(&self) -> Value {
        self.derive(self.data.item(-1), format!("Last in {}", self.name))
    }

    pub fn middle(&self) -> Value {
        let len = self.len();
        let data = if len == 0 {
            Data::Undefined
        } else {
            self.data.item(((len - 1) / 2) as isize)
        };
        self.derive(data, format!("Middle in {}", self.name))
    }

    pub fn random(&self) -> Value {
        let len = self.len();
        let data = if len == 0 {
            Data::Undefined
        } else {
            self.data.item(rand::thread_rng().gen_range(0..len) as isize)
        };
        self.derive(data, format!("Random in {}", self.name))
    }

    /// Property or index lookup on an object or array
    pub fn at(&self, key: &str) -> Value {
        self.derive(self.data.field(key), format!("{} in {}", key, self.name))
    }

    pub fn uppercase(&self) -> Value {
        self.derive(self.to_text().to_uppercase(), format!("Upper Case of {}", self.name))
    }

    pub fn lowercase(&self) -> Value {
        self.derive(self.to_text().to_lowercase(), format!("Lower Case of {}", self.name))
    }

    pub fn trim(&self) -> Value {
        self.derive(self.to_text().trim().to_string(), format!("Trimmed {}", self.name))
    }

    pub fn split(&self, separator: &str) -> Value {
        let parts: Vec<Data> = self
            .to_text()
            .split(separator)
            .map(Data::from)
            .collect();
        self.derive(Data::Array(parts), format!("Split {} by {:?}", self.name, separator))
    }

    pub fn join(&self, separator: &str) -> Value {
        let joined = match &self.data {
            Data::Array(items) => items
                .iter()
                .map(Data::to_text)
                .collect::<Vec<_>>()
                .join(separator),
            other => other.to_text(),
        };
        self.derive(joined, format!("Join {} with {:?}", self.name, separator))
    }

    fn items(&self) -> &[Data] {
        match &self.data {
            Data::Array(items) => items,
            _ => &[],
        }
    }

    pub fn count(&self) -> Value {
        self.derive(self.len(), format!("Count of {}", self.name))
    }

    pub fn sum(&self) -> Value {
        let total: f64 = projection::numbers(self.items()).iter().sum();
        self.derive(total, format!("Sum of {}", self.name))
    }

    pub fn avg(&self) -> Value {
        let numbers = projection::numbers(self.items());
        let data = if numbers.is_empty() {
            Data::Undefined
        } else {
            Data::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
        };
        self.derive(data, format!("Average of {}", self.name))
    }

    pub fn median(&self) -> Value {
        let data = projection::median(&projection::numbers(self.items()))
            .map(Data::Number)
            .unwrap_or(Data::Undefined);
        self.derive(data, format!("Median of {}", self.name))
    }

    pub fn min(&self) -> Value {
        let data = projection::numbers(self.items())
            .into_iter()
            .reduce(f64::min)
            .map(Data::Number)
            .unwrap_or(Data::Undefined);
        self.derive(data, format!("Min of {}", self.name))
    }

    pub fn max(&self) -> Value {
        let data = projection::numbers(self.items())
            .into_iter()
            .reduce(f64::max)
            .map(Data::Number)
            .unwrap_or(Data::Undefined);
        self.derive(data, format!("Max of {}", self.name))
    }

    /// Stable ascending sort with natural ordering
    pub fn sort_asc(&self) -> Value {
        let mut items = self.items().to_vec();
        items.sort_by(projection::compare_data);
        self.derive(Data::Array(items), format!("Ascending {}", self.name))
    }

    /// Stable descending sort with natural ordering
    pub fn sort_desc(&self) -> Value {
        let mut items = self.items().to_vec();
        items.sort_by(|a, b| projection::compare_data(b, a));
        self.derive(Data::Array(items), format!("Descending {}", self.name))
    }

    /// Group an array of objects by the string form of `key`
    pub fn group_by(&self, key: &str) -> Value {
        let mut groups: BTreeMap<String, Data> = BTreeMap::new();
        for item in self.items() {
            let group = item.field(key).to_text();
            if let Data::Array(members) = groups.entry(group).or_insert_with(|| Data::Array(Vec::new())) {
                members.push(item.clone());
            }
        }
        self.derive(Data::Object(groups), format!("{} grouped by {}", self.name, key))
    }

    /// Extract one field from every object in an array
    pub fn col(&self, key: &str) -> Value {
        let column = self.items().iter().map(|item| item.field(key)).collect();
        self.derive(Data::Array(column), format!("{} column of {}", key, self.name))
    }

    /// Remove duplicates, keeping first occurrences in order
    pub fn unique(&self) -> Value {
        let mut seen: Vec<Data> = Vec::new();
        for item in self.items() {
            if !seen.contains(item) {
                seen.push(item.clone());
            }
        }
        self.derive(Data::Array(seen), format!("Unique {}", self.name))
    }

    pub fn keys(&self) -> Value {
        let keys = match &self.data {
            Data::Object(map) => map.keys().cloned().map(Data::String).collect(),
            Data::Array(items) => (0..items.len()).map(Data::from).collect(),
            _ => Vec::new(),
        };
        self.derive(Data::Array(keys), format!("Keys of {}", self.name))
    }

    pub fn values(&self) -> Value {
        let values = match &self.data {
            Data::Object(map) => map.values().cloned().collect(),
            Data::Array(items) => items.clone(),
            _ => Vec::new(),
        };
        self.derive(Data::Array(values), format!("Values of {}", self.name))
    }

    // === Element capability ===

    /// The element handle, or an unsupported-capability error
    pub fn element(&self, capability: &str) -> Result<&ElementRef> {
        match &self.data {
            Data::Element(el) => Ok(el),
            other => Err(Error::unsupported(capability, &format!("{} value", other.type_name()))),
        }
    }

    pub async fn tag_name(&self) -> Result<Value> {
        let tag = self.element("tag_name")?.tag_name().await?;
        Ok(self.derive(tag, format!("Tag Name of {}", self.name)))
    }

    pub async fn attribute(&self, key: &str) -> Result<Value> {
        let attr = self.element("attribute")?.attribute(key).await?;
        Ok(self.derive(attr, format!("{} of {}", key, self.name)))
    }

    pub async fn property(&self, key: &str) -> Result<Value> {
        let prop = self.element("property")?.property(key).await?;
        Ok(self.derive(prop, format!("Property {} of {}", key, self.name)))
    }

    pub async fn has_class(&self, class: &str) -> Result<Value> {
        let has = self.element("has_class")?.has_class(class).await?;
        Ok(self.derive(has, format!("{} has class {}", self.name, class)))
    }

    pub async fn text(&self) -> Result<Value> {
        let text = self.element("text")?.text().await?;
        Ok(self.derive(text, format!("Text of {}", self.name)))
    }

    pub async fn html(&self) -> Result<Value> {
        let html = self.element("html")?.html().await?;
        Ok(self.derive(html.clone(), format!("HTML of {}", self.name)).with_highlight(html))
    }

    pub async fn find(&self, selector: &str) -> Result<Value> {
        let found = self.element("find")?.find(selector).await?;
        Ok(self.derive(found, format!("{} in {}", selector, self.name)))
    }

    pub async fn find_all(&self, selector: &str) -> Result<Value> {
        let found = self.element("find_all")?.find_all(selector).await?;
        Ok(self.derive(found, format!("{} in {}", selector, self.name)))
    }

    pub async fn children(&self, selector: Option<&str>) -> Result<Value> {
        let found = self.element("children")?.children(selector).await?;
        Ok(self.derive(found, format!("Children of {}", self.name)))
    }

    pub async fn siblings(&self, selector: Option<&str>) -> Result<Value> {
        let found = self.element("siblings")?.siblings(selector).await?;
        Ok(self.derive(found, format!("Siblings of {}", self.name)))
    }

    pub async fn parent_element(&self) -> Result<Value> {
        let found = self.element("parent")?.parent().await?;
        Ok(self.derive(found, format!("Parent of {}", self.name)))
    }

    pub async fn click(&self) -> Result<()> {
        self.element("click")?.click().await
    }

    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.element("type_text")?.type_text(text).await
    }

    pub async fn focus(&self) -> Result<()> {
        self.element("focus")?.focus().await
    }

    pub async fn blur(&self) -> Result<()> {
        self.element("blur")?.blur().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.element("clear")?.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Value {
        Value::new(
            items.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "list",
        )
    }

    #[test]
    fn test_projection_does_not_mutate_source() {
        let source = Value::new("  Hello World  ", "greeting");
        let upper = source.uppercase();
        let trimmed = source.trim();

        assert_eq!(upper.to_text(), "  HELLO WORLD  ");
        assert_eq!(trimmed.to_text(), "Hello World");
        assert_eq!(source.to_text(), "  Hello World  ");
        assert_eq!(trimmed.name(), "Trimmed greeting");
        assert_eq!(trimmed.parent().unwrap().name(), "greeting");
    }

    #[test]
    fn test_nth_first_last_middle() {
        let v = list(&["a", "b", "c", "d"]);
        assert_eq!(v.first().to_text(), "a");
        assert_eq!(v.last().to_text(), "d");
        assert_eq!(v.middle().to_text(), "b");
        assert_eq!(v.nth(2).to_text(), "c");
        assert_eq!(v.nth(-1).to_text(), "d");
        assert!(v.nth(10).is_undefined());
        assert!(Value::new(Data::Array(vec![]), "empty").first().is_undefined());
    }

    #[test]
    fn test_random_is_member() {
        let v = list(&["x", "y", "z"]);
        let picked = v.random().to_text();
        assert!(["x", "y", "z"].contains(&picked.as_str()));
    }

    #[test]
    fn test_numeric_aggregates() {
        let v = Value::new(vec![4, 1, 3, 2], "numbers");
        assert_eq!(v.sum().to_number(), 10.0);
        assert_eq!(v.avg().to_number(), 2.5);
        assert_eq!(v.median().to_number(), 2.5);
        assert_eq!(v.min().to_number(), 1.0);
        assert_eq!(v.max().to_number(), 4.0);
        assert_eq!(v.count().to_number(), 4.0);

        let empty = Value::new(Data::Array(vec![]), "empty");
        assert_eq!(empty.sum().to_number(), 0.0);
        assert!(empty.avg().is_undefined());
        assert!(empty.max().is_undefined());
    }

    #[test]
    fn test_sort_natural_and_stable() {
        let v = list(&["item10", "Item2", "item1"]);
        assert_eq!(v.sort_asc().join(",").to_text(), "item1,Item2,item10");
        assert_eq!(v.sort_desc().join(",").to_text(), "item10,Item2,item1");

        let numbers = Value::new(vec![10.0, 2.0, 33.0], "n");
        assert_eq!(numbers.sort_asc().join(" ").to_text(), "2 10 33");
    }

    #[test]
    fn test_split_join() {
        let v = Value::new("a-b-c", "dashed");
        let parts = v.split("-");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.join("+").to_text(), "a+b+c");
    }

    #[test]
    fn test_group_by_col_unique() {
        let rows: Data = serde_json::json!([
            {"team": "red", "score": 3},
            {"team": "blue", "score": 5},
            {"team": "red", "score": 1}
        ])
        .into();
        let v = Value::new(rows, "rows");

        let groups = v.group_by("team");
        assert_eq!(groups.at("red").len(), 2);
        assert_eq!(groups.at("blue").len(), 1);

        let scores = v.col("score");
        assert_eq!(scores.sum().to_number(), 9.0);

        let teams = v.col("team").unique();
        assert_eq!(teams.join(",").to_text(), "red,blue");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(Value::new(" 42 ", "s").to_number(), 42.0);
        assert!(Value::new("abc", "s").to_number().is_nan());
        assert!(!Value::new("", "s").to_bool());
        assert!(Value::new(1, "n").to_bool());
        assert_eq!(Value::new(3.0, "n").to_text(), "3");
        assert_eq!(Value::new(vec![1, 2], "n").to_json(), serde_json::json!([1.0, 2.0]));
        assert!(Value::new(Data::Null, "n").to_array().is_empty());
        assert_eq!(Value::new("x", "n").to_array().len(), 1);
    }

    #[test]
    fn test_introspection() {
        assert!(Value::undefined().is_null_or_undefined());
        assert!(Value::new(vec!["a"], "a").is_array());
        assert!(Value::new(true, "b").is_bool());
        assert_eq!(Value::new(serde_json::json!({"k": 1}), "o").type_name(), "object");
    }

    #[test]
    fn test_trace_and_source_inheritance() {
        let root = Value::new("<p>Hi</p>", "body").with_source(Arc::from("<p>Hi</p>"));
        let child = root.uppercase().trim();
        assert_eq!(child.source(), Some("<p>Hi</p>"));
        assert_eq!(child.trace(), "body -> Upper Case of body -> Trimmed Upper Case of body");
    }

    #[tokio::test]
    async fn test_element_ops_on_scalar_are_unsupported() {
        let v = Value::new("plain", "text");
        let err = v.attribute("href").await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(v.click().await.unwrap_err().is_unsupported());
    }
}
