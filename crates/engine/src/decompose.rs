use smallvec::SmallVec;

/// Ancestor prefixes of one record, shallowest first, each with its depth.
pub type Prefixes<'p> = SmallVec<[(&'p str, usize); 8]>;

/// The directory a report treats as depth 0.
///
/// Stored without trailing slashes. The empty string stands for the root of
/// the indexed tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TopDirectory {
    path: String,
}

impl TopDirectory {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Part of `path` below this directory: `Some("")` for the directory
    /// itself, `None` when `path` lies outside it.
    #[inline]
    pub fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.is_root() {
            return Some(path.trim_start_matches('/'));
        }
        match path.strip_prefix(self.path.as_str())? {
            "" => Some(""),
            rest => rest.strip_prefix('/'),
        }
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.relative(path).is_some()
    }
}

/// Every directory prefix, relative to `top`, whose totals include the
/// record at `path`.
///
/// Files stop at their parent directory; directories include themselves.
/// Prefixes deeper than `max_depth` are not produced. Returns `None` when
/// the record is outside `top`.
pub fn decompose<'p>(
    path: &'p str,
    is_dir: bool,
    top: &TopDirectory,
    max_depth: Option<usize>,
) -> Option<Prefixes<'p>> {
    let rel = top.relative(path)?;
    let cap = max_depth.unwrap_or(usize::MAX);
    let mut prefixes = Prefixes::new();

    if rel.is_empty() {
        if is_dir {
            prefixes.push(("", 0));
        }
        return Some(prefixes);
    }

    prefixes.push(("", 0));

    let mut depth = 0;
    for (idx, _) in rel.match_indices('/') {
        depth += 1;
        if depth > cap {
            return Some(prefixes);
        }
        prefixes.push((&rel[..idx], depth));
    }

    if is_dir && depth < cap {
        prefixes.push((rel, depth + 1));
    }

    Some(prefixes)
}

/// Depth of the record itself below `top`.
pub fn record_depth(path: &str, top: &TopDirectory) -> Option<usize> {
    let rel = top.relative(path)?;
    if rel.is_empty() {
        return Some(0);
    }
    Some(rel.matches('/').count() + 1)
}

#[cfg(test)]
#[path = "decompose_tests.rs"]
mod tests;
