use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::Point3;

/// Mapping from region names back to physical tags, persisted next to a mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalMeta {
    pub physical_domain: BTreeMap<String, Vec<usize>>,
    pub physical_boundary: BTreeMap<String, Vec<usize>>,
}

impl PhysicalMeta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.physical_domain.is_empty() && self.physical_boundary.is_empty()
    }
}

/// Elementary entity reference with orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oriented {
    pub tag: usize,
    pub reversed: bool,
}

impl Oriented {
    #[must_use]
    pub fn new(tag: usize, reversed: bool) -> Self {
        Self { tag, reversed }
    }
}

impl std::fmt::Display for Oriented {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reversed {
            write!(f, "-{}", self.tag)
        } else {
            write!(f, "{}", self.tag)
        }
    }
}

/// Builder for a gmsh `.geo` script.
///
/// Elementary entities share one tag counter; physical groups have their own.
#[derive(Debug, Clone)]
pub struct GeoScript {
    code: Vec<String>,
    next_tag: usize,
    next_physical: usize,
    meta: PhysicalMeta,
}

impl Default for GeoScript {
    fn default() -> Self {
        Self {
            code: Vec::new(),
            next_tag: 1,
            next_physical: 1,
            meta: PhysicalMeta::default(),
        }
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn physical_keyword(dim: usize) -> &'static str {
    match dim {
        0 => "Physical Point",
        1 => "Physical Line",
        2 => "Physical Surface",
        _ => "Physical Volume",
    }
}

impl GeoScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, keyword: &str, body: &str) -> usize {
        let tag = self.next_tag;
        self.next_tag += 1;
        self.code.push(format!("{keyword}({tag}) = {{{body}}};"));
        tag
    }

    /// Adds a point with characteristic length `lc`.
    pub fn point(&mut self, p: Point3, lc: f64) -> usize {
        let body = format!("{:?}, {:?}, {:?}, {lc:?}", p.x, p.y, p.z);
        self.push("Point", &body)
    }

    /// Adds a straight line between two point tags.
    pub fn line(&mut self, start: usize, end: usize) -> usize {
        self.push("Line", &format!("{start}, {end}"))
    }

    pub fn line_loop(&mut self, lines: &[Oriented]) -> usize {
        self.push("Line Loop", &join(lines))
    }

    pub fn plane_surface(&mut self, line_loop: usize) -> usize {
        self.push("Plane Surface", &line_loop.to_string())
    }

    pub fn surface_loop(&mut self, surfaces: &[Oriented]) -> usize {
        self.push("Surface Loop", &join(surfaces))
    }

    pub fn volume(&mut self, surface_loop: usize) -> usize {
        self.push("Volume", &surface_loop.to_string())
    }

    fn physical(&mut self, name: &str, dim: usize, tags: &[usize]) -> usize {
        let id = self.next_physical;
        self.next_physical += 1;
        self.code.push(format!("// {name}"));
        self.code
            .push(format!("{}({id}) = {{{}}};", physical_keyword(dim), join(tags)));
        id
    }

    /// Tags `tags` (entities of dimension `dim`) as the subdomain `name`.
    pub fn physical_domain(&mut self, name: &str, dim: usize, tags: &[usize]) -> usize {
        let id = self.physical(name, dim, tags);
        self.meta
            .physical_domain
            .entry(name.to_owned())
            .or_default()
            .push(id);
        id
    }

    /// Tags `tags` (entities of dimension `dim`) as the boundary `name`.
    pub fn physical_boundary(&mut self, name: &str, dim: usize, tags: &[usize]) -> usize {
        let id = self.physical(name, dim, tags);
        self.meta
            .physical_boundary
            .entry(name.to_owned())
            .or_default()
            .push(id);
        id
    }

    /// Appends verbatim lines.
    pub fn raw(&mut self, lines: &[&str]) {
        self.code.extend(lines.iter().map(|l| (*l).to_owned()));
    }

    /// The script text, one statement per line.
    #[must_use]
    pub fn code(&self) -> String {
        let mut out = String::new();
        for line in &self.code {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn meta(&self) -> &PhysicalMeta {
        &self.meta
    }

    /// Number of statements written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
