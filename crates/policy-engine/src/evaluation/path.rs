use serde_json::Value;

/// One step of a parsed JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Member(String),
    Index(usize),
}

/// Parsed JSON path limited to members and array indices, e.g.
/// `$.applicant.loans[0]['monthly emi']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("path is empty".to_string());
        }

        let body = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let chars: Vec<char> = body.chars().collect();
        let mut segments = Vec::new();
        let mut position = 0;

        // A `$`-less path starts with a bare member name.
        if !trimmed.starts_with('$') {
            let (name, next) = read_member(&chars, 0)?;
            segments.push(PathSegment::Member(name));
            position = next;
        }

        while position < chars.len() {
            match chars[position] {
                '.' => {
                    if chars.get(position + 1) == Some(&'.') {
                        return Err("recursive descent is not supported".to_string());
                    }
                    let (name, next) = read_member(&chars, position + 1)?;
                    segments.push(PathSegment::Member(name));
                    position = next;
                }
                '[' => {
                    let close = chars[position..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| position + offset)
                        .ok_or_else(|| "unterminated '['".to_string())?;
                    let inner: String = chars[position + 1..close].iter().collect();
                    segments.push(parse_bracket(inner.trim())?);
                    position = close + 1;
                }
                other => return Err(format!("unexpected character '{other}'")),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk the document; `None` when any step is absent.
    pub fn locate<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Member(name), Value::Object(map)) => map.get(name)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn read_member(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    let name: String = chars[start..end].iter().collect();
    if name.is_empty() {
        return Err("empty member name".to_string());
    }
    if name == "*" {
        return Err("wildcards are not supported".to_string());
    }
    Ok((name, end))
}

fn parse_bracket(inner: &str) -> Result<PathSegment, String> {
    if inner.is_empty() {
        return Err("empty brackets".to_string());
    }
    if inner == "*" {
        return Err("wildcards are not supported".to_string());
    }
    if inner.starts_with('?') {
        return Err("filter expressions are not supported".to_string());
    }
    if inner.contains(':') && !is_quoted(inner) {
        return Err("array slices are not supported".to_string());
    }
    if is_quoted(inner) {
        return Ok(PathSegment::Member(inner[1..inner.len() - 1].to_string()));
    }
    inner
        .parse::<usize>()
        .map(PathSegment::Index)
        .map_err(|_| format!("'{inner}' is not an array index"))
}

fn is_quoted(inner: &str) -> bool {
    inner.len() >= 2
        && ((inner.starts_with('\'') && inner.ends_with('\''))
            || (inner.starts_with('"') && inner.ends_with('"')))
}
