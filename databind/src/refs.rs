//! Object-identity tracking and forward-reference ordering.
//!
//! When elements of a container participate in object identity, an element
//! may reference an id whose definition appears later in the stream. The
//! container deserializer then routes additions through a
//! [`RefsAccumulator`] instead of pushing directly, so that splicing a
//! late-resolved value back in preserves the original encounter order.
//!
//! Resolution is driven by the per-call [`ObjectIdTable`]: whenever a class
//! deserializer finishes an instance that declares an identity property, it
//! binds the id there, and the enclosing container flushes any pending
//! segments that became resolvable.

use std::collections::HashMap;

use databind_core::{BindError, IdKey, Value};

/// Per-call table of resolved object ids.
#[derive(Debug, Default)]
pub struct ObjectIdTable {
    resolved: HashMap<IdKey, Value>,
}

impl ObjectIdTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the instance bound to `id`.
    ///
    /// An id may be defined only once per call; a second definition is a
    /// data error.
    pub fn bind(&mut self, id: IdKey, value: Value) -> Result<(), BindError> {
        if self.resolved.contains_key(&id) {
            return Err(BindError::invalid_value(format!(
                "object id {id} is already bound to another instance"
            )));
        }
        log::trace!("object id {id} bound");
        self.resolved.insert(id, value);
        Ok(())
    }

    /// The instance bound to `id`, if defined so far.
    pub fn resolve(&self, id: &IdKey) -> Option<&Value> {
        self.resolved.get(id)
    }
}

/// One pending segment: an unresolved id plus everything collected after it.
#[derive(Debug)]
struct PendingSegment {
    id: IdKey,
    following: Vec<Value>,
}

/// Ordered accumulator preserving element order under out-of-order
/// identity resolution.
///
/// Elements are pushed as they are read. When an element turns out to be an
/// unresolved forward reference, [`RefsAccumulator::defer`] opens a pending
/// segment; subsequent pushes land in that segment. Resolving an id splices
/// its value, followed by the segment's trailing elements, into the segment
/// before it — or into the result when it is the earliest pending segment —
/// which reconstructs the original input order.
#[derive(Debug, Default)]
pub struct RefsAccumulator {
    result: Vec<Value>,
    pending: Vec<PendingSegment>,
}

impl RefsAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully-read element.
    pub fn push(&mut self, value: Value) {
        match self.pending.last_mut() {
            Some(segment) => segment.following.push(value),
            None => self.result.push(value),
        }
    }

    /// Open a pending segment for an unresolved id.
    pub fn defer(&mut self, id: IdKey) {
        log::trace!("deferring forward reference to id {id}");
        self.pending.push(PendingSegment {
            id,
            following: Vec::new(),
        });
    }

    /// Splice the value for a now-resolved id back into position.
    pub fn resolve(&mut self, id: &IdKey, value: Value) -> Result<(), BindError> {
        let Some(pos) = self.pending.iter().position(|segment| segment.id == *id) else {
            return Err(BindError::invalid_value(format!(
                "no pending forward reference for object id {id}"
            )));
        };
        let segment = self.pending.remove(pos);
        let mut spliced = Vec::with_capacity(segment.following.len() + 1);
        spliced.push(value);
        spliced.extend(segment.following);
        match pos.checked_sub(1) {
            Some(prev) => self.pending[prev].following.extend(spliced),
            None => self.result.extend(spliced),
        }
        Ok(())
    }

    /// Splice every pending id that `table` has since resolved.
    pub fn flush_resolved(&mut self, table: &ObjectIdTable) -> Result<(), BindError> {
        loop {
            let Some((id, value)) = self.pending.iter().find_map(|segment| {
                table
                    .resolve(&segment.id)
                    .map(|value| (segment.id.clone(), value.clone()))
            }) else {
                return Ok(());
            };
            self.resolve(&id, value)?;
        }
    }

    /// Whether any forward reference is still unresolved.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Finish, failing if a forward reference never resolved.
    pub fn into_values(self) -> Result<Vec<Value>, BindError> {
        match self.pending.first() {
            Some(segment) => Err(BindError::UnresolvedForwardReference {
                id: segment.id.clone(),
            }),
            None => Ok(self.result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    #[test]
    fn in_order_elements_pass_through() {
        let mut acc = RefsAccumulator::new();
        acc.push(int(1));
        acc.push(int(2));
        assert_eq!(acc.into_values().unwrap(), vec![int(1), int(2)]);
    }

    #[test]
    fn scripted_out_of_order_resolution_preserves_order() {
        // Input order: a, <ref 10>, b, <ref 20>, c
        // Resolution order: 20 first, then 10.
        let mut acc = RefsAccumulator::new();
        acc.push(int(1)); // a
        acc.defer(IdKey::Int(10));
        acc.push(int(3)); // b
        acc.defer(IdKey::Int(20));
        acc.push(int(5)); // c

        acc.resolve(&IdKey::Int(20), int(4)).unwrap();
        assert!(acc.has_pending());
        acc.resolve(&IdKey::Int(10), int(2)).unwrap();

        assert_eq!(
            acc.into_values().unwrap(),
            vec![int(1), int(2), int(3), int(4), int(5)]
        );
    }

    #[test]
    fn unresolved_pending_is_an_error() {
        let mut acc = RefsAccumulator::new();
        acc.defer(IdKey::Str("missing".into()));
        acc.push(int(1));
        match acc.into_values() {
            Err(BindError::UnresolvedForwardReference { id }) => {
                assert_eq!(id, IdKey::Str("missing".into()));
            }
            other => panic!("expected unresolved forward reference, got {other:?}"),
        }
    }

    #[test]
    fn resolving_unknown_id_is_rejected() {
        let mut acc = RefsAccumulator::new();
        assert!(acc.resolve(&IdKey::Int(1), int(1)).is_err());
    }

    #[test]
    fn table_rejects_duplicate_ids() {
        let mut table = ObjectIdTable::new();
        table.bind(IdKey::Int(1), int(10)).unwrap();
        assert!(table.bind(IdKey::Int(1), int(11)).is_err());
    }
}
