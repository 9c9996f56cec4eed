//! A tiny stylesheet compiler for exercising the cache.
//!
//! Supports `@import "name";`, variable definitions (`@name: value;`) and
//! flat rule sets whose values may reference variables. Every file is read
//! through [`RenderContext::read_file`].

#![allow(dead_code)]

use indoc::indoc;
use less_cache::{CacheConfig, Compiler, LessCache, RenderContext};
use miette::{bail, miette};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const MAX_IMPORT_DEPTH: usize = 32;

/// The test compiler. Clones share the invocation counter.
#[derive(Clone, Default)]
pub struct MiniLess {
    calls: Arc<AtomicUsize>,
}

impl MiniLess {
    /// Number of times `render` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Compiler for MiniLess {
    fn render(&self, source: &str, ctx: &mut RenderContext) -> miette::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dir = ctx
            .source_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut state = State::default();
        state.evaluate(source, &dir, ctx, 0)?;
        Ok(state.output)
    }
}

#[derive(Default)]
struct State {
    variables: HashMap<String, String>,
    output: String,
}

impl State {
    fn evaluate(
        &mut self,
        source: &str,
        dir: &Path,
        ctx: &mut RenderContext,
        depth: usize,
    ) -> miette::Result<()> {
        if depth > MAX_IMPORT_DEPTH {
            bail!("imports nested too deeply");
        }

        let mut rest = source;
        loop {
            let next = rest.find([';', '{']);
            let Some(index) = next else {
                if !rest.trim().is_empty() {
                    bail!("unexpected end of input after '{}'", rest.trim());
                }
                return Ok(());
            };

            let head = rest[..index].trim();
            if rest[index..].starts_with(';') {
                self.statement(head, dir, ctx, depth)?;
                rest = &rest[index + 1..];
            } else {
                let body_start = index + 1;
                let Some(close) = rest[body_start..].find('}') else {
                    bail!("missing closing brace for '{}'", head);
                };
                let body = &rest[body_start..body_start + close];
                if body.contains('{') {
                    bail!("nested rule sets are not supported");
                }
                self.rule_set(head, body)?;
                rest = &rest[body_start + close + 1..];
            }
        }
    }

    fn statement(
        &mut self,
        statement: &str,
        dir: &Path,
        ctx: &mut RenderContext,
        depth: usize,
    ) -> miette::Result<()> {
        if let Some(target) = statement.strip_prefix("@import") {
            let name = target.trim().trim_matches(|c: char| c == '"' || c == '\'');
            return self.import(name, dir, ctx, depth);
        }

        if let Some(definition) = statement.strip_prefix('@') {
            let Some((name, value)) = definition.split_once(':') else {
                bail!("malformed variable definition '{}'", statement);
            };
            let value = self.substitute(value.trim())?;
            self.variables.insert(name.trim().to_string(), value);
            return Ok(());
        }

        bail!("unrecognized statement '{}'", statement)
    }

    fn import(
        &mut self,
        name: &str,
        dir: &Path,
        ctx: &mut RenderContext,
        depth: usize,
    ) -> miette::Result<()> {
        let file_name = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{name}.less")
        };

        let candidates: Vec<PathBuf> = std::iter::once(dir.join(&file_name))
            .chain(ctx.search_paths().iter().map(|path| path.join(&file_name)))
            .collect();

        for candidate in candidates {
            if let Ok(content) = ctx.read_file(&candidate) {
                let parent = candidate
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                return self.evaluate(&content, &parent, ctx, depth + 1);
            }
        }

        Err(miette!("'{}' wasn't found", file_name))
    }

    fn rule_set(&mut self, selector: &str, body: &str) -> miette::Result<()> {
        if selector.is_empty() {
            bail!("rule set without a selector");
        }

        self.output.push_str(selector);
        self.output.push_str(" {\n");
        for declaration in body.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            let Some((property, value)) = declaration.split_once(':') else {
                bail!("malformed declaration '{}'", declaration);
            };
            let value = self.substitute(value.trim())?;
            self.output
                .push_str(&format!("  {}: {};\n", property.trim(), value));
        }
        self.output.push_str("}\n");
        Ok(())
    }

    fn substitute(&self, value: &str) -> miette::Result<String> {
        value
            .split_whitespace()
            .map(|word| match word.strip_prefix('@') {
                Some(name) => self
                    .variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| miette!("variable @{} is undefined", name)),
                None => Ok(word.to_string()),
            })
            .collect::<miette::Result<Vec<_>>>()
            .map(|words| words.join(" "))
    }
}

pub const IMPORTS_LESS: &str = indoc! {r#"
    @import "a";
    @import "b";
    @import "c";
    @import "d";

    body {
      a: @a;
      b: @b;
      c: @c;
      d: @d;
    }
"#};

/// A temporary project:
///
/// ```text
/// imports.less         imports a, b, c, d
/// a.less               @a: 1;
/// b.less               @b: 2;
/// invalid.less         unterminated rule set
/// imports-1/c.less     @c: 3;
/// imports-1/d.less     @d: 4;
/// imports-2/c.less     @c: 30;
/// ```
pub struct Fixtures {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl Fixtures {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        fs::create_dir_all(root.join("imports-1")).unwrap();
        fs::create_dir_all(root.join("imports-2")).unwrap();
        fs::write(root.join("imports.less"), IMPORTS_LESS).unwrap();
        fs::write(root.join("a.less"), "@a: 1;").unwrap();
        fs::write(root.join("b.less"), "@b: 2;").unwrap();
        fs::write(root.join("invalid.less"), "body {\n  a: 1;\n").unwrap();
        fs::write(root.join("imports-1/c.less"), "@c: 3;").unwrap();
        fs::write(root.join("imports-1/d.less"), "@d: 4;").unwrap();
        fs::write(root.join("imports-2/c.less"), "@c: 30;").unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        fs::write(self.path(relative), content).unwrap();
    }

    pub fn import_paths(&self) -> Vec<PathBuf> {
        vec![self.path("imports-1"), self.path("imports-2")]
    }

    /// Config for a cache in `<root>/<name>` using both import paths.
    pub fn config(&self, name: &str) -> CacheConfig {
        CacheConfig {
            import_paths: self.import_paths(),
            ..CacheConfig::new(self.path(name))
        }
    }

    pub fn cache(&self, config: CacheConfig) -> (LessCache, MiniLess) {
        let compiler = MiniLess::default();
        let cache = LessCache::new(config, compiler.clone()).unwrap();
        (cache, compiler)
    }
}

/// Expected output for the given values of `@a` through `@d`.
pub fn body(a: &str, b: &str, c: &str, d: &str) -> String {
    format!("body {{\n  a: {a};\n  b: {b};\n  c: {c};\n  d: {d};\n}}\n")
}
