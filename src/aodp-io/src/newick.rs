use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use seq::Tree;

#[derive(Error, Debug)]
pub enum NewickError {
    #[error(
        "cannot parse Newick tree file ({file})\n\
         ** failed before reading the first node label\n\
         ** Newick tree format reference:\n   \
         http://evolution.genetics.washington.edu/phylip/newick_doc.html"
    )]
    NoToken { file: String },

    #[error(
        "cannot parse Newick tree file ({file})\n\
         ** last label read: {last}\n\
         ** Newick tree format reference:\n   \
         http://evolution.genetics.washington.edu/phylip/newick_doc.html"
    )]
    Syntax { file: String, last: String },
}

/// Parse a phylogeny in the Newick `(...)name:length,...;` grammar.
///
/// Internal node labels are kept when present; generated labels are assigned
/// later. Errors carry the last label read.
pub fn parse(path: &Path) -> Result<Tree> {
    let file = path.display().to_string();
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot open Newick tree file ({file})"))?;

    Parser { bytes: text.as_bytes(), pos: 0, last_token: None }.parse_tree(&file)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    last_token: Option<String>,
}

impl Parser<'_> {
    fn error(&self, file: &str) -> anyhow::Error {
        match &self.last_token {
            None => NewickError::NoToken { file: file.to_string() }.into(),
            Some(last) => NewickError::Syntax { file: file.to_string(), last: last.clone() }.into(),
        }
    }

    fn parse_tree(&mut self, file: &str) -> Result<Tree> {
        let tree = self.subtree().ok_or_else(|| self.error(file))?;
        self.skip_space();
        if !self.eat(b';') {
            return Err(self.error(file));
        }
        self.skip_space();
        if self.pos != self.bytes.len() {
            return Err(self.error(file));
        }
        Ok(tree)
    }

    fn subtree(&mut self) -> Option<Tree> {
        self.skip_space();
        if self.eat(b'(') {
            let mut children = vec![self.subtree()?];
            loop {
                self.skip_space();
                if self.eat(b',') {
                    children.push(self.subtree()?);
                    continue;
                }
                break;
            }
            if !self.eat(b')') {
                return None;
            }
            let name = self.label();
            let len = self.length();
            return Some(Tree::internal(children, name, len));
        }

        let name = self.label();
        if name.is_empty() {
            return None;
        }
        let len = self.length();
        Some(Tree::leaf(name, len))
    }

    fn label(&mut self) -> String {
        self.skip_space();
        let start = self.pos;
        while let Some(&c) = self.bytes.get(self.pos) {
            if c.is_ascii_whitespace() || matches!(c, b'(' | b')' | b',' | b':' | b';') {
                break;
            }
            self.pos += 1;
        }
        let label = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        if !label.is_empty() {
            self.last_token = Some(label.clone());
        }
        label
    }

    fn length(&mut self) -> String {
        self.skip_space();
        if !self.eat(b':') {
            return String::new();
        }
        self.label()
    }

    fn skip_space(&mut self) {
        while self.bytes.get(self.pos).is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&c) {
            self.pos += 1;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn parse_str(text: &str) -> Result<Tree> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        parse(f.path())
    }

    #[test]
    fn parses_nested_groups() {
        let mut t = parse_str("((A:0.1,B:0.2):0.05,C);\n").unwrap();
        t.label("Node");
        assert_eq!(t.to_string(), "((A:0.1,B:0.2)Node2:0.05,C)Node1");

        let groups = t.groups();
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[2].0, "Node2");
    }

    #[test]
    fn keeps_existing_internal_labels() {
        let t = parse_str("((A,B)ab,C)root;").unwrap();
        assert_eq!(t.name, "root");
        assert_eq!(t.children[0].name, "ab");
    }

    #[test]
    fn reports_last_token_on_error() {
        let err = parse_str("((A,B),C").unwrap_err();
        assert!(err.to_string().contains("last label read: C"), "{err}");

        let err = parse_str("").unwrap_err();
        assert!(err.to_string().contains("before reading the first node label"));
    }
}
