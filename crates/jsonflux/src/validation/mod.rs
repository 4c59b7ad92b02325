use std::sync::Arc;

use ahash::AHashSet;
use jsonflux_dom::Value;
use smallvec::SmallVec;

use crate::{
    builder::DomBuilder,
    error::{Error, ValidationCode},
    events::Event,
    schema::{
        node::{SchemaNode, ValidatorKind},
        validators::{CombineMode, GenericValidator, PropertyMatch, TypeSet},
    },
};

/// Per-session validation context: the current byte offset, whether
/// `default` injection is active, and the sink through which an object
/// frame hands synthesized members to the DOM builder.
pub(crate) struct ValidationCtx {
    pub(crate) offset: u64,
    pub(crate) inject_defaults: bool,
    /// Members to synthesize into the object that closed on this event,
    /// drained by the parse session before it forwards the close to the
    /// builder.
    pub(crate) defaults: Vec<(Arc<str>, Value)>,
}

impl ValidationCtx {
    pub(crate) fn new(inject_defaults: bool) -> ValidationCtx {
        ValidationCtx {
            offset: 0,
            inject_defaults,
            defaults: Vec::new(),
        }
    }
}

/// Tracks when one instance node (scalar or whole subtree) has been fully
/// consumed, without interpreting it.
#[derive(Debug, Default)]
struct NodeTracker {
    depth: u32,
}

impl NodeTracker {
    /// Returns true when the event completes the node.
    fn feed(&mut self, event: &Event<'_>) -> bool {
        match event {
            Event::ObjectBegin | Event::ArrayBegin => {
                self.depth += 1;
                false
            }
            Event::ObjectEnd | Event::ArrayEnd => {
                self.depth = self.depth.saturating_sub(1);
                self.depth == 0
            }
            Event::Key(_) => false,
            _ => self.depth == 0,
        }
    }
}

/// What a frame did with an event.
enum Feed {
    /// Event absorbed; frame continues.
    Consumed,
    /// Push a child frame; `replay` re-dispatches the current event to it.
    Push {
        node: Arc<SchemaNode>,
        capture: bool,
        replay: bool,
    },
    /// The frame's node is finished; pop it.
    Complete(Completion),
}

/// Carried from a completed frame to its parent and the session.
#[derive(Default)]
struct Completion {
    /// The instance value, present when the frame was captured.
    value: Option<Value>,
    /// Defaults for unseen properties of the object that just closed.
    defaults: Vec<(Arc<str>, Value)>,
}

struct ObjectFrame {
    expecting_value: bool,
    count: u64,
    missing_required: AHashSet<Box<str>>,
    pending_defaults: Vec<(Arc<str>, Value)>,
}

struct ArrayFrame {
    index: u64,
    /// Accepted elements, kept only under `uniqueItems`.
    seen: Vec<Value>,
}

enum BranchStatus {
    Alive,
    Finished,
    Dead(Error),
}

struct Branch {
    state: ValidationState,
    status: BranchStatus,
}

struct CombinedFrame {
    mode: CombineMode,
    branches: Vec<Branch>,
    tracker: NodeTracker,
}

/// Pure value capture (the `enum` keyword): consume the node, compare at
/// the end.
struct CaptureFrame {
    tracker: NodeTracker,
}

enum FrameData {
    Fresh,
    Object(ObjectFrame),
    Array(ArrayFrame),
    Combined(CombinedFrame),
    Capture(CaptureFrame),
}

struct Frame {
    node: Arc<SchemaNode>,
    data: FrameData,
    /// The parent asked for this frame's instance value (`uniqueItems`).
    wants_capture: bool,
}

struct CaptureSlot {
    frame_index: usize,
    builder: DomBuilder,
}

/// The SAX validation stack machine.
///
/// One frame per open instance node; combinator frames clone one sub-state
/// per branch and multiplex every event to all live branches, which keeps
/// validation strictly online at O(branches × depth) state. Events arrive
/// exactly once, in source order, at every live branch.
pub(crate) struct ValidationState {
    stack: Vec<Frame>,
    captures: Vec<CaptureSlot>,
}

impl ValidationState {
    pub(crate) fn new(root: Arc<SchemaNode>) -> ValidationState {
        ValidationState {
            stack: vec![Frame {
                node: root,
                data: FrameData::Fresh,
                wants_capture: false,
            }],
            captures: Vec::new(),
        }
    }

    /// True once the root node has been validated to completion.
    pub(crate) fn is_complete(&self) -> bool {
        self.stack.is_empty()
    }

    /// Dispatches one event to the machine.
    pub(crate) fn check(&mut self, event: &Event<'_>, ctx: &mut ValidationCtx) -> Result<(), Error> {
        for slot in &mut self.captures {
            slot.builder.on_event(event, ctx.offset)?;
        }
        loop {
            let Some(index) = self.stack.len().checked_sub(1) else {
                return Err(Error::internal("event after validation completed"));
            };
            self.prepare_fresh(index, event, ctx)?;
            match self.stack[index].feed(event, ctx)? {
                Feed::Consumed => return Ok(()),
                Feed::Push {
                    node,
                    capture,
                    replay,
                } => {
                    tracing::trace!(
                        depth = self.stack.len(),
                        location = node.location.as_ref(),
                        "push validator frame"
                    );
                    self.stack.push(Frame {
                        node,
                        data: FrameData::Fresh,
                        wants_capture: capture,
                    });
                    if replay {
                        continue;
                    }
                    return Ok(());
                }
                Feed::Complete(mut completion) => {
                    if self.captures.last().map(|slot| slot.frame_index) == Some(index) {
                        let Some(mut slot) = self.captures.pop() else {
                            return Err(Error::internal("capture stack out of sync"));
                        };
                        let value = slot.builder.finish()?;
                        if let ValidatorKind::Enum(options) = &self.stack[index].node.kind {
                            options.check(&value, &self.stack[index].node.location, ctx.offset)?;
                        }
                        completion.value = Some(value);
                    }
                    tracing::trace!(depth = self.stack.len(), "pop validator frame");
                    self.stack.pop();
                    ctx.defaults.append(&mut completion.defaults);
                    match self.stack.last_mut() {
                        None => return Ok(()),
                        Some(parent) => {
                            parent.child_completed(completion, ctx)?;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// On a frame's first event: follow `$ref`, and open a capture when the
    /// node needs its instance value.
    fn prepare_fresh(
        &mut self,
        index: usize,
        event: &Event<'_>,
        ctx: &ValidationCtx,
    ) -> Result<(), Error> {
        if !matches!(self.stack[index].data, FrameData::Fresh) {
            return Ok(());
        }
        let node = SchemaNode::dereference(&self.stack[index].node, ctx.offset)?;
        self.stack[index].node = node;
        let wants = self.stack[index].wants_capture
            || matches!(self.stack[index].node.kind, ValidatorKind::Enum(_));
        if wants && self.captures.last().map(|slot| slot.frame_index) != Some(index) {
            let mut builder = DomBuilder::new(false);
            builder.on_event(event, ctx.offset)?;
            self.captures.push(CaptureSlot {
                frame_index: index,
                builder,
            });
        }
        Ok(())
    }
}

impl Frame {
    fn feed(&mut self, event: &Event<'_>, ctx: &mut ValidationCtx) -> Result<Feed, Error> {
        let Frame { node, data, .. } = self;
        loop {
            match data {
                FrameData::Fresh => {
                    if let Some(transformed) = fresh_feed(node, event, ctx)? {
                        *data = transformed;
                        match data {
                            // Containers consumed their opening bracket.
                            FrameData::Object(_) | FrameData::Array(_) => {
                                return Ok(Feed::Consumed)
                            }
                            // Combinators and captures still have to see
                            // the current event.
                            _ => continue,
                        }
                    }
                    // A scalar node accepted on its single event.
                    return Ok(Feed::Complete(Completion::default()));
                }
                FrameData::Object(frame) => return frame.feed(node, event, ctx),
                FrameData::Array(frame) => return frame.feed(node, event, ctx),
                FrameData::Combined(frame) => return frame.feed(node, event, ctx),
                FrameData::Capture(frame) => {
                    if frame.tracker.feed(event) {
                        return Ok(Feed::Complete(Completion::default()));
                    }
                    return Ok(Feed::Consumed);
                }
            }
        }
    }

    fn child_completed(&mut self, completion: Completion, ctx: &ValidationCtx) -> Result<(), Error> {
        match &mut self.data {
            FrameData::Object(frame) => {
                frame.expecting_value = false;
                Ok(())
            }
            FrameData::Array(frame) => {
                if let Some(value) = completion.value {
                    if frame.seen.contains(&value) {
                        return Err(Error::validation(
                            ValidationCode::UniqueViolation,
                            format!("duplicate array element at index {}", frame.index - 1),
                            self.node.location.as_ref(),
                            ctx.offset,
                        ));
                    }
                    frame.seen.push(value);
                }
                Ok(())
            }
            _ => Err(Error::internal("stray child completion")),
        }
    }
}

/// Handles a node's first event. Returns the frame data to transition to,
/// or `None` when the node is a scalar that validated on this event.
fn fresh_feed(
    node: &Arc<SchemaNode>,
    event: &Event<'_>,
    ctx: &ValidationCtx,
) -> Result<Option<FrameData>, Error> {
    let location = node.location.as_ref();
    let mismatch = |expected: &str| {
        Error::validation(
            ValidationCode::TypeMismatch,
            format!("expected {expected}, got {}", event.describe()),
            location,
            ctx.offset,
        )
    };
    match &node.kind {
        ValidatorKind::Reference(_) => Err(Error::internal("undereferenced reference frame")),
        ValidatorKind::Null => match event {
            Event::Null => Ok(None),
            _ => Err(mismatch("null")),
        },
        ValidatorKind::Boolean => match event {
            Event::Bool(_) => Ok(None),
            _ => Err(mismatch("boolean")),
        },
        ValidatorKind::String(validator) => match event {
            Event::String(text) => {
                validator.check(text, location, ctx.offset)?;
                Ok(None)
            }
            _ => Err(mismatch("string")),
        },
        ValidatorKind::Number(validator) => match event {
            Event::Number(lexeme, _) => {
                let number = jsonflux_dom::Number::from_lexeme(lexeme)
                    .map_err(|err| Error::internal(err.to_string()))?;
                validator.check(&number, location, ctx.offset)?;
                Ok(None)
            }
            _ => Err(mismatch(if validator.integer { "integer" } else { "number" })),
        },
        ValidatorKind::Array(validator) => match event {
            Event::ArrayBegin => Ok(Some(FrameData::Array(ArrayFrame::new()))),
            _ => Err(mismatch("array")),
        },
        ValidatorKind::Object(validator) => match event {
            Event::ObjectBegin => Ok(Some(FrameData::Object(ObjectFrame::new(Some(validator), ctx)))),
            _ => Err(mismatch("object")),
        },
        ValidatorKind::Generic(generic) => generic_fresh(generic, node, event, ctx),
        ValidatorKind::Combined(combined) => {
            let branches = combined
                .branches
                .iter()
                .map(|branch| Branch {
                    state: ValidationState::new(branch.clone()),
                    status: BranchStatus::Alive,
                })
                .collect();
            Ok(Some(FrameData::Combined(CombinedFrame {
                mode: combined.mode,
                branches,
                tracker: NodeTracker::default(),
            })))
        }
        ValidatorKind::Enum(_) => Ok(Some(FrameData::Capture(CaptureFrame {
            tracker: NodeTracker::default(),
        }))),
    }
}

fn generic_fresh(
    generic: &GenericValidator,
    node: &Arc<SchemaNode>,
    event: &Event<'_>,
    ctx: &ValidationCtx,
) -> Result<Option<FrameData>, Error> {
    let location = node.location.as_ref();
    let type_error = || {
        Error::validation(
            ValidationCode::TypeMismatch,
            format!(
                "{} is not admitted by type {:?}",
                event.describe(),
                generic.types.unwrap_or_default()
            ),
            location,
            ctx.offset,
        )
    };
    match event {
        Event::Null => {
            if !generic.admits(TypeSet::NULL) {
                return Err(type_error());
            }
            Ok(None)
        }
        Event::Bool(_) => {
            if !generic.admits(TypeSet::BOOLEAN) {
                return Err(type_error());
            }
            Ok(None)
        }
        Event::String(text) => {
            if !generic.admits(TypeSet::STRING) {
                return Err(type_error());
            }
            if let Some(validator) = &generic.string {
                validator.check(text, location, ctx.offset)?;
            }
            Ok(None)
        }
        Event::Number(lexeme, _) => {
            let number = jsonflux_dom::Number::from_lexeme(lexeme)
                .map_err(|err| Error::internal(err.to_string()))?;
            let admitted = match generic.types {
                None => true,
                Some(types) => {
                    types.contains(TypeSet::NUMBER)
                        || (types.contains(TypeSet::INTEGER) && number.is_integer())
                }
            };
            if !admitted {
                return Err(type_error());
            }
            if let Some(validator) = &generic.number {
                validator.check(&number, location, ctx.offset)?;
            }
            Ok(None)
        }
        Event::ArrayBegin => {
            if !generic.admits(TypeSet::ARRAY) {
                return Err(type_error());
            }
            Ok(Some(FrameData::Array(ArrayFrame::new())))
        }
        Event::ObjectBegin => {
            if !generic.admits(TypeSet::OBJECT) {
                return Err(type_error());
            }
            Ok(Some(FrameData::Object(ObjectFrame::new(
                generic.object.as_ref(),
                ctx,
            ))))
        }
        Event::Key(_) | Event::ObjectEnd | Event::ArrayEnd => {
            Err(Error::internal("structural event on a fresh frame"))
        }
    }
}

impl ObjectFrame {
    fn new(
        validator: Option<&crate::schema::validators::ObjectValidator>,
        ctx: &ValidationCtx,
    ) -> ObjectFrame {
        let missing_required = validator
            .map(|v| v.required_set.clone())
            .unwrap_or_default();
        let pending_defaults = match validator {
            Some(v) if ctx.inject_defaults => v
                .defaults()
                .into_iter()
                .filter_map(|(key, node)| {
                    node.default
                        .as_ref()
                        .map(|value| (Arc::<str>::from(key.as_ref()), value.clone()))
                })
                .collect(),
            _ => Vec::new(),
        };
        ObjectFrame {
            expecting_value: false,
            count: 0,
            missing_required,
            pending_defaults,
        }
    }

    fn feed(
        &mut self,
        node: &Arc<SchemaNode>,
        event: &Event<'_>,
        ctx: &mut ValidationCtx,
    ) -> Result<Feed, Error> {
        let validator = node.object_validator();
        let location = node.location.as_ref();
        match event {
            Event::Key(key) => {
                if self.expecting_value {
                    return Err(Error::internal("key while expecting a member value"));
                }
                self.count += 1;
                self.missing_required.remove(*key);
                self.pending_defaults
                    .retain(|(pending, _)| pending.as_ref() != *key);
                let child = match validator {
                    None => SchemaNode::any(),
                    Some(v) => {
                        v.check_max(self.count, location, ctx.offset)?;
                        match v.match_property(key) {
                            PropertyMatch::Schemas(mut nodes) => {
                                if nodes.len() == 1 {
                                    nodes.swap_remove(0)
                                } else {
                                    conjunction(nodes, location)
                                }
                            }
                            PropertyMatch::Additional(node) => node,
                            PropertyMatch::Forbidden => {
                                return Err(Error::validation(
                                    ValidationCode::UnknownProperty,
                                    format!("property {key:?} is not allowed"),
                                    location,
                                    ctx.offset,
                                ));
                            }
                        }
                    }
                };
                self.expecting_value = true;
                Ok(Feed::Push {
                    node: child,
                    capture: false,
                    replay: false,
                })
            }
            Event::ObjectEnd => {
                if self.expecting_value {
                    return Err(Error::internal("object closed while expecting a value"));
                }
                if let Some(v) = validator {
                    v.check_close(self.count, &self.missing_required, location, ctx.offset)?;
                }
                Ok(Feed::Complete(Completion {
                    value: None,
                    defaults: std::mem::take(&mut self.pending_defaults),
                }))
            }
            _ => Err(Error::internal("unexpected event inside an object frame")),
        }
    }
}

impl ArrayFrame {
    fn new() -> ArrayFrame {
        ArrayFrame {
            index: 0,
            seen: Vec::new(),
        }
    }

    fn feed(
        &mut self,
        node: &Arc<SchemaNode>,
        event: &Event<'_>,
        ctx: &mut ValidationCtx,
    ) -> Result<Feed, Error> {
        let validator = node.array_validator();
        let location = node.location.as_ref();
        match event {
            Event::ArrayEnd => {
                if let Some(v) = validator {
                    v.check_close(self.index, location, ctx.offset)?;
                }
                Ok(Feed::Complete(Completion::default()))
            }
            event if event.starts_value() => {
                let unique = validator.is_some_and(|v| v.unique_items);
                let child = match validator {
                    None => SchemaNode::any(),
                    Some(v) => v.element_node(self.index, location, ctx.offset)?,
                };
                self.index += 1;
                Ok(Feed::Push {
                    node: child,
                    capture: unique,
                    replay: true,
                })
            }
            _ => Err(Error::internal("unexpected event inside an array frame")),
        }
    }
}

impl CombinedFrame {
    fn feed(
        &mut self,
        node: &Arc<SchemaNode>,
        event: &Event<'_>,
        ctx: &mut ValidationCtx,
    ) -> Result<Feed, Error> {
        let location = node.location.as_ref();
        // Multiplex to every live branch, in schema source order. Branch
        // sub-states never inject defaults; only the winning path outside
        // combinators does.
        let mut branch_ctx = ValidationCtx::new(false);
        branch_ctx.offset = ctx.offset;
        for branch in &mut self.branches {
            if !matches!(branch.status, BranchStatus::Alive) {
                continue;
            }
            match branch.state.check(event, &mut branch_ctx) {
                Ok(()) => {
                    if branch.state.is_complete() {
                        branch.status = BranchStatus::Finished;
                    }
                }
                Err(err) => {
                    if self.mode == CombineMode::AllOf {
                        // The first failing branch's error wins outright.
                        return Err(err);
                    }
                    branch.status = BranchStatus::Dead(err);
                }
            }
        }
        let complete = self.tracker.feed(event);
        let alive_or_finished = self
            .branches
            .iter()
            .any(|b| !matches!(b.status, BranchStatus::Dead(_)));
        if !complete {
            // With every branch dead the verdict cannot improve; reject at
            // the earliest possible event.
            if !alive_or_finished && self.mode != CombineMode::Not {
                return Err(self.failure(location, ctx.offset));
            }
            return Ok(Feed::Consumed);
        }
        let finished = self
            .branches
            .iter()
            .filter(|b| matches!(b.status, BranchStatus::Finished))
            .count();
        match self.mode {
            CombineMode::AllOf => {
                if finished == self.branches.len() {
                    Ok(Feed::Complete(Completion::default()))
                } else {
                    Err(Error::internal("allOf branch out of sync"))
                }
            }
            CombineMode::AnyOf => {
                if finished >= 1 {
                    Ok(Feed::Complete(Completion::default()))
                } else {
                    Err(self.failure(location, ctx.offset))
                }
            }
            CombineMode::OneOf => match finished {
                1 => Ok(Feed::Complete(Completion::default())),
                0 => Err(self.failure(location, ctx.offset)),
                _ => Err(Error::validation(
                    ValidationCode::OneOfFailed,
                    "more than one oneOf branch matched",
                    location,
                    ctx.offset,
                )),
            },
            CombineMode::Not => {
                if finished == 0 {
                    Ok(Feed::Complete(Completion::default()))
                } else {
                    Err(Error::validation(
                        ValidationCode::NotFailed,
                        "instance matches the forbidden schema",
                        location,
                        ctx.offset,
                    ))
                }
            }
        }
    }

    /// Failure error for quorum misses, carrying the first dead branch's
    /// message for context.
    fn failure(&self, location: &str, offset: u64) -> Error {
        let detail = self.branches.iter().find_map(|b| match &b.status {
            BranchStatus::Dead(err) => Some(err.to_string()),
            _ => None,
        });
        let message = match detail {
            Some(detail) => format!("no {} branch matched: {detail}", self.mode.keyword()),
            None => format!("no {} branch matched", self.mode.keyword()),
        };
        Error::validation(self.mode.failure_code(), message, location, offset)
    }
}

/// Wraps several property schemas that all apply to one member into a
/// transient conjunction.
fn conjunction(
    nodes: SmallVec<[Arc<SchemaNode>; 2]>,
    location: &str,
) -> Arc<SchemaNode> {
    Arc::new(SchemaNode {
        kind: ValidatorKind::Combined(crate::schema::validators::CombinedValidator {
            mode: CombineMode::AllOf,
            branches: nodes.into_vec(),
        }),
        default: None,
        location: location.into(),
    })
}
