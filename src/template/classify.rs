//! Placeholder classification.
//!
//! Scans the literal segments of a template once, left to right, tracking
//! quote, bracket and tag state. At each placeholder boundary the state
//! decides the placeholder's [`Role`]:
//!
//! 1. inside a tag and inside quotes: [`Role::AttributeValue`]
//! 2. inside a tag, unquoted: [`Role::AttributeName`]
//! 3. otherwise: [`Role::Content`]
//!
//! Classification never fails. Malformed input just yields a best-effort role.

use super::marker;

/// Syntactic role of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Inside a quoted attribute value: `class="${x}"`.
    AttributeValue,
    /// Bare inside a tag: `<div ${x}>`. Eligible for spread.
    AttributeName,
    /// Between tags.
    Content,
}

/// Running scanner state. Exposed for diagnostics and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    pub in_single_quote: bool,
    pub in_double_quote: bool,
    pub in_tag: bool,
    pub tag_depth: usize,
    pub paren_depth: usize,
    pub curly_depth: usize,
    pub square_depth: usize,
    /// Last name seen inside the current tag; the attribute a quoted value
    /// belongs to.
    pub attribute: String,
    name_done: bool,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@')
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_quote(&self) -> bool {
        self.in_single_quote || self.in_double_quote
    }

    /// Advance over one literal segment.
    ///
    /// Escapes are counted within the segment: a quote preceded by an odd
    /// run of backslashes does not toggle.
    pub fn scan(&mut self, segment: &str) {
        let mut backslashes = 0usize;
        for c in segment.chars() {
            let escaped = backslashes % 2 == 1;
            match c {
                '"' if !escaped && !self.in_single_quote => {
                    self.in_double_quote = !self.in_double_quote;
                }
                '\'' if !escaped && !self.in_double_quote => {
                    self.in_single_quote = !self.in_single_quote;
                }
                _ => {}
            }

            if !self.in_quote() {
                match c {
                    '(' => self.paren_depth += 1,
                    ')' => self.paren_depth = self.paren_depth.saturating_sub(1),
                    '{' => self.curly_depth += 1,
                    '}' => self.curly_depth = self.curly_depth.saturating_sub(1),
                    '[' => self.square_depth += 1,
                    ']' => self.square_depth = self.square_depth.saturating_sub(1),
                    '<' => {
                        self.in_tag = true;
                        self.tag_depth += 1;
                        self.attribute.clear();
                        self.name_done = false;
                    }
                    '>' => {
                        self.tag_depth = self.tag_depth.saturating_sub(1);
                        self.in_tag = self.tag_depth > 0;
                    }
                    c if self.in_tag && is_name_char(c) => {
                        if self.name_done {
                            self.attribute.clear();
                            self.name_done = false;
                        }
                        self.attribute.push(c);
                    }
                    _ if self.in_tag => self.name_done = true,
                    _ => {}
                }
            }

            backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        }
    }

    /// Role of a placeholder at the current position.
    pub fn role(&self) -> Role {
        match (self.in_tag, self.in_quote()) {
            (true, true) => Role::AttributeValue,
            (true, false) => Role::AttributeName,
            (false, _) => Role::Content,
        }
    }
}

/// Placeholder values indexed by marker id. Each entry can be taken once.
#[derive(Debug)]
pub struct MarkerTable<V> {
    entries: Vec<Option<V>>,
    roles: Vec<Role>,
    /// Enclosing attribute name, for [`Role::AttributeValue`] markers.
    attributes: Vec<Option<String>>,
    claimed: Vec<bool>,
}

impl<V> MarkerTable<V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Role assigned to marker `id`.
    pub fn role(&self, id: usize) -> Option<Role> {
        self.roles.get(id).copied()
    }

    /// Attribute that encloses value marker `id`.
    pub fn attribute(&self, id: usize) -> Option<&str> {
        self.attributes.get(id)?.as_deref()
    }

    pub fn get(&self, id: usize) -> Option<&V> {
        self.entries.get(id)?.as_ref()
    }

    /// Whether `id` has been taken already.
    pub fn is_claimed(&self, id: usize) -> bool {
        self.claimed.get(id).copied().unwrap_or(false)
    }

    /// Whether `::id` found in the parsed markup at a site with `role` (and,
    /// for attribute values, inside `attribute`) is a marker this table
    /// emitted and has not handed out yet. Anything else is literal text.
    pub fn accepts(&self, id: usize, role: Role, attribute: Option<&str>) -> bool {
        id < self.len()
            && self.role(id) == Some(role)
            && !self.is_claimed(id)
            && attribute.map_or(true, |name| self.attribute(id) == Some(name))
    }

    /// Take the value for `id`. Later calls for the same id return `None`.
    pub fn take(&mut self, id: usize) -> Option<V> {
        if let Some(claimed) = self.claimed.get_mut(id) {
            *claimed = true;
        }
        self.entries.get_mut(id)?.take()
    }

    /// Ids and values never taken, in id order.
    pub fn drain_remaining(&mut self) -> impl Iterator<Item = (usize, V)> + '_ {
        self.claimed.iter_mut().for_each(|claimed| *claimed = true);
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(id, entry)| entry.take().map(|v| (id, v)))
    }
}

/// Marker-annotated text plus the values its markers refer to.
#[derive(Debug)]
pub struct Classified<V> {
    pub markup: String,
    pub table: MarkerTable<V>,
}

/// Interleave `segments` with markers for `values`.
///
/// Placeholder `i` sits between `segments[i]` and `segments[i + 1]`; its
/// marker id is `i`. Values without a following segment are dropped.
pub fn classify<V>(segments: &[&str], values: Vec<V>) -> Classified<V> {
    let slots = segments.len().saturating_sub(1);
    if values.len() > slots {
        tracing::debug!(
            values = values.len(),
            slots,
            "more values than placeholders; extra values dropped"
        );
    }

    let mut state = ScanState::new();
    let mut markup = String::with_capacity(segments.iter().map(|s| s.len() + 16).sum());
    let mut entries = Vec::with_capacity(slots);
    let mut roles = Vec::with_capacity(slots);
    let mut attributes = Vec::with_capacity(slots);
    let mut values = values.into_iter();

    for (i, segment) in segments.iter().enumerate() {
        state.scan(segment);
        markup.push_str(segment);
        if i + 1 == segments.len() {
            break;
        }
        let role = state.role();
        tracing::trace!(marker = i, ?role, ?state, "classified placeholder");
        markup.push_str(&marker::encode(role, i));
        entries.push(values.next());
        roles.push(role);
        attributes.push((role == Role::AttributeValue).then(|| state.attribute.clone()));
    }

    Classified {
        markup,
        table: MarkerTable {
            entries,
            roles,
            attributes,
            claimed: vec![false; slots],
        },
    }
}
