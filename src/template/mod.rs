//! Path template parsing and resolution.
//!
//! A template is a path pattern with named placeholders, e.g.
//! `{project}/{shot}/{task}/v{version:03}/{shot}_{task}.{frame:04}.{ext}`.
//! Resolution substitutes every placeholder from a variable mapping and is
//! all-or-nothing: a missing variable fails the whole resolution, naming the
//! key. Resolution is a pure function of (template, variables); the only
//! filesystem access happens when the `version` variable carries the
//! `latest` sentinel and lookup is delegated to the version manager.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::version::VersionManager;

/// Sentinel value for the `version` variable that resolves to the highest
/// existing version on disk.
pub const LATEST: &str = "latest";

const VERSION_KEY: &str = "version";

/// Variable mapping consumed by resolution. Ordered for deterministic
/// error reporting and logging.
pub type Variables = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, width: Option<usize> },
}

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string. Placeholders are `{name}` or `{name:0W}`
    /// where `W` is the exact zero-padding width of a numeric value.
    pub fn parse(id: &str, raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut body = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => body.push(c),
                    None => {
                        return Err(TemplateError::InvalidSyntax {
                            id: id.to_string(),
                            reason: format!("unclosed placeholder '{{{}'", body),
                        }
                        .into())
                    }
                }
            }

            segments.push(parse_placeholder(id, &body)?);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            id: id.to_string(),
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Substitute every placeholder from `vars`. Pure; no filesystem access.
    pub fn resolve(&self, vars: &Variables) -> Result<PathBuf> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, width } => {
                    let value = vars.get(name).ok_or_else(|| {
                        TemplateError::UnresolvedVariable { key: name.clone() }
                    })?;
                    match width {
                        None => out.push_str(value),
                        Some(width) => {
                            let number: u64 =
                                value.parse().map_err(|_| TemplateError::NotNumeric {
                                    key: name.clone(),
                                    value: value.clone(),
                                })?;
                            if number.to_string().len() > *width {
                                return Err(TemplateError::PaddingOverflow {
                                    key: name.clone(),
                                    value: value.clone(),
                                    width: *width,
                                }
                                .into());
                            }
                            out.push_str(&format!("{:0w$}", number, w = width));
                        }
                    }
                }
            }
        }

        debug!("Resolved template '{}' to {}", self.id, out);
        Ok(PathBuf::from(out))
    }

    /// The template for everything before the path component holding the
    /// `version` placeholder, or `None` if no component holds one.
    fn version_parent(&self) -> Result<Option<Template>> {
        let components: Vec<&str> = self.raw.split('/').collect();
        let index = components
            .iter()
            .position(|c| component_has_version(c));
        match index {
            Some(i) => {
                let prefix = components[..i].join("/");
                Template::parse(&self.id, &prefix).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn component_has_version(component: &str) -> bool {
    component.contains(&format!("{{{}}}", VERSION_KEY))
        || component.contains(&format!("{{{}:", VERSION_KEY))
}

fn parse_placeholder(id: &str, body: &str) -> Result<Segment> {
    let (name, width) = match body.split_once(':') {
        Some((name, spec)) => {
            let width: usize = spec
                .parse()
                .ok()
                .filter(|w| (1..=16).contains(w))
                .ok_or_else(|| TemplateError::InvalidSyntax {
                    id: id.to_string(),
                    reason: format!("bad padding spec '{}' for '{}'", spec, name),
                })?;
            (name, Some(width))
        }
        None => (body, None),
    };

    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(TemplateError::InvalidSyntax {
            id: id.to_string(),
            reason: format!("invalid placeholder name '{}'", name),
        }
        .into());
    }

    Ok(Segment::Placeholder {
        name: name.to_string(),
        width,
    })
}

/// Read-only mapping of template id to parsed template, built once at
/// startup from configuration. Reload means rebuilding the registry, never
/// patching it in place.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
}

impl TemplateRegistry {
    pub fn from_strings<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut templates = BTreeMap::new();
        for (id, raw) in entries {
            templates.insert(id.to_string(), Template::parse(id, raw)?);
        }
        Ok(Self { templates })
    }

    /// Look up a template by id, failing with `UnknownTemplate` when absent.
    pub fn get(&self, id: &str) -> Result<&Template> {
        self.templates
            .get(id)
            .ok_or_else(|| TemplateError::UnknownTemplate { id: id.to_string() }.into())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Resolves template ids against variable mappings, delegating `latest`
/// version lookups to the version manager.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: TemplateRegistry,
}

impl Resolver {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Resolve `template_id` against `vars`.
    ///
    /// When `vars` carries `version = "latest"`, the prefix of the template
    /// up to the version component is resolved first, the highest existing
    /// version under that directory is looked up via `versions`, and
    /// substitution then completes with the literal number. Everything else
    /// is pure string substitution.
    pub fn resolve(
        &self,
        template_id: &str,
        vars: &Variables,
        versions: &VersionManager,
    ) -> Result<PathBuf> {
        let template = self.registry.get(template_id)?;

        if vars.get(VERSION_KEY).map(String::as_str) != Some(LATEST) {
            return template.resolve(vars);
        }

        let Some(parent) = template.version_parent()? else {
            // No version component; the sentinel is irrelevant here.
            let mut vars = vars.clone();
            vars.remove(VERSION_KEY);
            return template.resolve(&vars);
        };

        let parent_dir = parent.resolve(vars)?;
        let latest = versions.latest(&parent_dir)?;
        debug!(
            "Resolved 'latest' to v{} under {:?} for template '{}'",
            latest, parent_dir, template_id
        );

        let mut vars = vars.clone();
        vars.insert(VERSION_KEY.to_string(), latest.to_string());
        template.resolve(&vars)
    }
}

/// Build a [`Variables`] mapping from (key, value) pairs.
pub fn variables<'a, I>(entries: I) -> Variables
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
