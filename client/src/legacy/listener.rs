use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::legacy::{
    diff::{PatchOp, TreePatch},
    value::TreeValue,
};

/// Errors that can occur while compiling a listener path pattern.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("segment '{segment}' did not compile: {source}")]
    BadSegment {
        segment: String,
        source: regex::Error,
    },
}

/// Stable handle for one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a matched listener receives: the patch plus the values captured by
/// its placeholder segments, keyed by placeholder name.
pub struct PatchEvent<'p> {
    pub path: &'p [String],
    pub op: PatchOp,
    pub value: Option<&'p TreeValue>,
    pub params: HashMap<String, String>,
}

pub type PatchHandler = Box<dyn FnMut(&PatchEvent)>;

struct Segment {
    regex: Regex,
    placeholder: Option<String>,
}

struct Listener {
    id: ListenerId,
    segments: Vec<Segment>,
    handler: PatchHandler,
}

/// Path-pattern listener registry for the tree-diff engine.
///
/// Patterns are slash-delimited; `:id`, `:number`, `:string` and `:axis`
/// segments are placeholders whose matched values are surfaced to the
/// handler, `*` matches anything, and every other segment matches
/// literally. A patch matches a listener iff the segment counts are equal
/// and every segment matches. At most one fallback listener receives the
/// patches matched by no specific listener.
pub struct PatchListeners {
    listeners: Vec<Listener>,
    fallback: Option<PatchHandler>,
    next_id: u64,
}

impl PatchListeners {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            fallback: None,
            next_id: 0,
        }
    }

    fn compile_segment(raw: &str) -> Result<Segment, PatternError> {
        let (pattern, placeholder) = match raw {
            ":id" => (r"^[a-zA-Z0-9_-]+$".to_string(), Some("id")),
            ":number" => (r"^[0-9]+$".to_string(), Some("number")),
            ":string" => (r"^\w+$".to_string(), Some("string")),
            ":axis" => (r"^[xyz]$".to_string(), Some("axis")),
            "*" => (r"^.*$".to_string(), None),
            literal => (format!("^{}$", regex::escape(literal)), None),
        };
        let regex = Regex::new(&pattern).map_err(|source| PatternError::BadSegment {
            segment: raw.to_string(),
            source,
        })?;
        Ok(Segment {
            regex,
            placeholder: placeholder.map(str::to_string),
        })
    }

    pub fn listen(
        &mut self,
        pattern: &str,
        handler: PatchHandler,
    ) -> Result<ListenerId, PatternError> {
        let segments = pattern
            .split('/')
            .map(Self::compile_segment)
            .collect::<Result<Vec<_>, _>>()?;
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            segments,
            handler,
        });
        Ok(id)
    }

    /// Install the single fallback listener, replacing any previous one.
    pub fn set_fallback(&mut self, handler: PatchHandler) {
        self.fallback = Some(handler);
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
        self.fallback = None;
    }

    /// Dispatch each patch to every matching listener, or to the fallback
    /// when none matched.
    pub fn dispatch(&mut self, patches: &[TreePatch]) {
        for patch in patches {
            let mut matched = false;
            for listener in &mut self.listeners {
                if let Some(params) = match_segments(&listener.segments, &patch.path) {
                    matched = true;
                    (listener.handler)(&PatchEvent {
                        path: &patch.path,
                        op: patch.op,
                        value: patch.value.as_ref(),
                        params,
                    });
                }
            }
            if !matched {
                if let Some(fallback) = &mut self.fallback {
                    fallback(&PatchEvent {
                        path: &patch.path,
                        op: patch.op,
                        value: patch.value.as_ref(),
                        params: HashMap::new(),
                    });
                }
            }
        }
    }
}

impl Default for PatchListeners {
    fn default() -> Self {
        Self::new()
    }
}

fn match_segments(
    segments: &[Segment],
    path: &[String],
) -> Option<HashMap<String, String>> {
    if segments.len() != path.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (segment, value) in segments.iter().zip(path.iter()) {
        if !segment.regex.is_match(value) {
            return None;
        }
        if let Some(name) = &segment.placeholder {
            params.insert(name.clone(), value.clone());
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::PatchListeners;
    use crate::legacy::diff::{PatchOp, TreePatch};

    fn patch(path: &[&str]) -> TreePatch {
        TreePatch {
            path: path.iter().map(|s| s.to_string()).collect(),
            op: PatchOp::Add,
            value: None,
        }
    }

    #[test]
    fn placeholder_capture() {
        let mut listeners = PatchListeners::new();
        let captured = Rc::new(RefCell::new(Vec::new()));
        let captured_in = captured.clone();
        listeners
            .listen(
                "players/:id",
                Box::new(move |event| {
                    captured_in
                        .borrow_mut()
                        .push(event.params.get("id").cloned().unwrap());
                }),
            )
            .unwrap();

        listeners.dispatch(&[patch(&["players", "key1"]), patch(&["players", "key3"])]);
        assert_eq!(*captured.borrow(), ["key1", "key3"]);
    }

    #[test]
    fn segment_count_must_match() {
        let mut listeners = PatchListeners::new();
        let hits = Rc::new(RefCell::new(0));
        let hits_in = hits.clone();
        listeners
            .listen("players/:id", Box::new(move |_| *hits_in.borrow_mut() += 1))
            .unwrap();

        listeners.dispatch(&[patch(&["players"]), patch(&["players", "a", "x"])]);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn axis_and_number_placeholders() {
        let mut listeners = PatchListeners::new();
        let axes = Rc::new(RefCell::new(Vec::new()));
        let axes_in = axes.clone();
        listeners
            .listen(
                "players/:id/position/:axis",
                Box::new(move |event| {
                    axes_in
                        .borrow_mut()
                        .push(event.params.get("axis").cloned().unwrap());
                }),
            )
            .unwrap();

        listeners.dispatch(&[
            patch(&["players", "p1", "position", "x"]),
            patch(&["players", "p1", "position", "w"]),
        ]);
        assert_eq!(*axes.borrow(), ["x"]);
    }

    #[test]
    fn fallback_receives_unmatched_only() {
        let mut listeners = PatchListeners::new();
        let unmatched = Rc::new(RefCell::new(0));
        let unmatched_in = unmatched.clone();
        listeners
            .listen("players/:id", Box::new(|_| {}))
            .unwrap();
        listeners.set_fallback(Box::new(move |_| *unmatched_in.borrow_mut() += 1));

        listeners.dispatch(&[patch(&["players", "p1"]), patch(&["messages", "0"])]);
        assert_eq!(*unmatched.borrow(), 1);
    }
}
