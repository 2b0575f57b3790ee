//! Step group normalization passes
//!
//! - expand_steps: inline group references inside `steps`
//! - set_default_steps: attach the default group to tasks without steps
//! - expand_task_steps: replace each task's steps with concrete step lists
//!
//! A step group is a sequence whose entries are either step mappings or bare
//! strings naming another group. Expansion walks references with an explicit
//! stack; revisiting a name already on the stack is a cycle.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::{DefsError, DefsResult};
use crate::tree::{DefMap, DefNode, Scalar};

const STEP_GROUP: &str = "step group";

struct Frame {
    name: Option<String>,
    entries: Vec<DefNode>,
    pos: usize,
    out: Vec<DefNode>,
}

impl Frame {
    fn new(name: Option<String>, entries: Vec<DefNode>) -> Self {
        Self {
            name,
            entries,
            pos: 0,
            out: Vec::new(),
        }
    }
}

/// Resolves step group references against a snapshot of the groups.
pub(crate) struct StepExpander<'a> {
    groups: &'a DefMap,
    resolved: HashMap<String, Vec<DefNode>>,
}

impl<'a> StepExpander<'a> {
    pub(crate) fn new(groups: &'a DefMap) -> Self {
        Self {
            groups,
            resolved: HashMap::new(),
        }
    }

    /// Expands the named group into its concrete step list.
    pub(crate) fn expand_group(&mut self, name: &str) -> DefsResult<Vec<DefNode>> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(done.clone());
        }
        let entries = self.group_entries(name)?;
        self.expand(Some(name.to_string()), entries)
    }

    /// Expands a list of entries that belongs to no group.
    pub(crate) fn expand_entries(&mut self, entries: &[DefNode]) -> DefsResult<Vec<DefNode>> {
        self.expand(None, entries.to_vec())
    }

    fn group_entries(&self, name: &str) -> DefsResult<Vec<DefNode>> {
        self.groups
            .get(name)
            .and_then(DefNode::as_seq)
            .map(<[DefNode]>::to_vec)
            .ok_or_else(|| DefsError::definition_not_found(STEP_GROUP, name))
    }

    fn expand(&mut self, owner: Option<String>, entries: Vec<DefNode>) -> DefsResult<Vec<DefNode>> {
        let mut stack = vec![Frame::new(owner, entries)];

        loop {
            let entry = {
                let Some(frame) = stack.last_mut() else {
                    return Ok(Vec::new());
                };
                let entry = frame.entries.get(frame.pos).cloned();
                frame.pos += 1;
                entry
            };

            match entry {
                Some(DefNode::Scalar(Scalar::Str(reference))) => {
                    self.enter(&mut stack, reference)?;
                }
                Some(step) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.out.push(step);
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        return Ok(Vec::new());
                    };
                    if let Some(name) = &done.name {
                        self.resolved.insert(name.clone(), done.out.clone());
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.out.extend(done.out),
                        None => return Ok(done.out),
                    }
                }
            }
        }
    }

    fn enter(&mut self, stack: &mut Vec<Frame>, reference: String) -> DefsResult<()> {
        if let Some(done) = self.resolved.get(&reference) {
            if let Some(frame) = stack.last_mut() {
                frame.out.extend(done.iter().cloned());
            }
            return Ok(());
        }

        if stack.iter().any(|f| f.name.as_deref() == Some(reference.as_str())) {
            let mut chain: Vec<String> = stack.iter().filter_map(|f| f.name.clone()).collect();
            chain.push(reference);
            return Err(DefsError::CyclicStepReference { chain });
        }

        let entries = self.group_entries(&reference)?;
        stack.push(Frame::new(Some(reference), entries));
        Ok(())
    }
}

pub(crate) fn expand_steps(defs: &mut DefNode) -> DefsResult<()> {
    let Some(groups) = defs.get("steps").and_then(DefNode::as_map).cloned() else {
        return Ok(());
    };

    let mut expander = StepExpander::new(&groups);
    let mut expanded = Vec::with_capacity(groups.len());
    for (name, group) in &groups {
        if group.as_seq().is_some() {
            expanded.push((name.clone(), expander.expand_group(name)?));
        }
    }

    if let Some(steps) = defs.get_mut("steps").and_then(DefNode::as_map_mut) {
        for (name, list) in expanded {
            steps.insert(name, DefNode::Seq(list));
        }
    }
    Ok(())
}

/// Calls `f` with the name and mapping of every task.
fn for_each_task(
    defs: &mut DefNode,
    mut f: impl FnMut(&str, &mut DefMap) -> DefsResult<()>,
) -> DefsResult<()> {
    let Some(task_groups) = defs.get_mut("taskGroups").and_then(DefNode::as_map_mut) else {
        return Ok(());
    };
    for tasks in task_groups.values_mut() {
        let Some(tasks) = tasks.as_map_mut() else {
            continue;
        };
        for (name, task) in tasks.iter_mut() {
            if let Some(task) = task.as_map_mut() {
                f(name, task)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn set_default_steps(defs: &mut DefNode, default_steps_name: &str) -> DefsResult<()> {
    for_each_task(defs, |name, task| {
        if !task.contains_key("steps") {
            debug!(task = name, steps = default_steps_name, "default steps attached");
            task.insert("steps".into(), DefNode::string(default_steps_name));
        }
        Ok(())
    })
}

pub(crate) fn expand_task_steps(defs: &mut DefNode) -> DefsResult<()> {
    let groups = defs
        .get("steps")
        .and_then(DefNode::as_map)
        .cloned()
        .unwrap_or_default();
    let mut expander = StepExpander::new(&groups);

    for_each_task(defs, |_, task| {
        let expanded = match task.get("steps") {
            Some(DefNode::Scalar(Scalar::Str(group))) => expander.expand_group(group)?,
            Some(DefNode::Seq(entries)) => expander.expand_entries(entries)?,
            _ => return Ok(()),
        };
        task.insert("steps".into(), DefNode::Seq(expanded));
        Ok(())
    })
}
