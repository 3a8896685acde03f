use std::fmt;

/// A method pattern from the access policy. `*` matches any run of
/// characters; everything else is literal. Matching is unanchored, so a
/// pattern matches when it fits anywhere inside the method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPattern {
    raw: String,
    segments: Vec<String>,
}

impl MethodPattern {
    pub fn new(raw: &str) -> Self {
        let segments = raw
            .split('*')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, method: &str) -> bool {
        // Leftmost placement of each literal segment leaves the most room
        // for the ones after it.
        let mut rest = method;
        for segment in &self.segments {
            match rest.find(segment.as_str()) {
                Some(at) => rest = &rest[at + segment.len()..],
                None => return false,
            }
        }
        true
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
