use std::collections::{HashMap, HashSet};

use crate::models::{Thread, ThreadNode};

/// Parent ID → positions of its direct replies in the thread list.
///
/// Positions are in insertion order. The index must be rebuilt whenever the
/// list changes length, order or any thread's parent.
#[derive(Debug, Clone, Default)]
pub struct ReplyIndex {
    children: HashMap<String, Vec<usize>>,
}

impl ReplyIndex {
    pub fn build(threads: &[Thread]) -> Self {
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, thread) in threads.iter().enumerate() {
            if let Some(parent) = &thread.parent_id {
                children.entry(parent.clone()).or_default().push(pos);
            }
        }
        Self { children }
    }

    /// Record a thread appended at `pos`
    pub fn push(&mut self, pos: usize, thread: &Thread) {
        if let Some(parent) = &thread.parent_id {
            self.children.entry(parent.clone()).or_default().push(pos);
        }
    }

    pub fn children(&self, parent_id: &str) -> &[usize] {
        self.children.get(parent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the reply tree under `threads[root]`.
    ///
    /// Threads rejected by `render` are dropped along with their subtree.
    /// A thread already on the current path is not descended into again, so a
    /// parent cycle yields a finite tree. Nodes `max_depth` levels below the
    /// root keep their reply count but carry no replies and are marked
    /// truncated.
    ///
    /// Walks with an explicit stack so chain length never grows the call stack.
    pub fn tree(
        &self,
        threads: &[Thread],
        root: usize,
        max_depth: usize,
        render: &dyn Fn(&Thread) -> bool,
    ) -> Option<ThreadNode> {
        let thread = threads.get(root)?;
        if !render(thread) {
            return None;
        }

        let mut path = HashSet::from([root]);
        let mut stack = vec![Frame::new(root, thread, self.children(&thread.id), max_depth == 0)];

        loop {
            let frame = stack.last_mut()?;
            let next = frame.pending.next();

            if let Some(&child) = next {
                let Some(reply) = threads.get(child) else { continue };
                if !render(reply) || path.contains(&child) {
                    continue;
                }
                path.insert(child);
                let at_limit = stack.len() >= max_depth;
                stack.push(Frame::new(child, reply, self.children(&reply.id), at_limit));
                continue;
            }

            let done = stack.pop()?;
            path.remove(&done.pos);
            let node = done.finish();
            match stack.last_mut() {
                Some(parent) => parent.replies.push(node),
                None => return Some(node),
            }
        }
    }
}

/// One open node of an in-progress tree walk
struct Frame<'a> {
    pos: usize,
    thread: &'a Thread,
    reply_count: usize,
    pending: std::slice::Iter<'a, usize>,
    replies: Vec<ThreadNode>,
    truncated: bool,
}

impl<'a> Frame<'a> {
    fn new(pos: usize, thread: &'a Thread, children: &'a [usize], at_limit: bool) -> Self {
        // At the depth limit nothing below is visited
        let visit: &'a [usize] = if at_limit { &[] } else { children };
        Self {
            pos,
            thread,
            reply_count: children.len(),
            pending: visit.iter(),
            replies: Vec::new(),
            truncated: at_limit && !children.is_empty(),
        }
    }

    fn finish(self) -> ThreadNode {
        ThreadNode {
            thread: self.thread.clone(),
            reply_count: self.reply_count,
            replies: self.replies,
            truncated: self.truncated,
        }
    }
}

/// Whether giving `thread_id` the parent `parent_id` would make it its own ancestor
pub fn would_cycle(threads: &[Thread], thread_id: &str, parent_id: Option<&str>) -> bool {
    let mut seen = HashSet::new();
    let mut current = parent_id.map(str::to_string);
    while let Some(id) = current {
        if id == thread_id {
            return true;
        }
        if !seen.insert(id.clone()) {
            // Pre-existing cycle above us that doesn't include thread_id
            return false;
        }
        current = threads
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.parent_id.clone());
    }
    false
}
