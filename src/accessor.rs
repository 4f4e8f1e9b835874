/// Lens pair projecting one module's slice out of the shared application
/// state. The table uses it to thread a sub-state through a dispatch cycle
/// without knowing its concrete shape.
///
/// The lens laws are the caller's contract, not runtime-checked:
/// `get(set(sub, state)) == sub`, and `set` must leave unrelated fields of
/// the state untouched. Violations show up as state loss after dispatch.
pub struct StateAccessor<S, Sub> {
    get: fn(&S) -> Sub,
    set: fn(Sub, &mut S),
}

impl<S, Sub> StateAccessor<S, Sub> {
    pub fn new(get: fn(&S) -> Sub, set: fn(Sub, &mut S)) -> Self {
        Self { get, set }
    }

    pub fn get(&self, state: &S) -> Sub {
        (self.get)(state)
    }

    pub fn set(&self, sub: Sub, state: &mut S) {
        (self.set)(sub, state)
    }
}

impl<S, Sub> Clone for StateAccessor<S, Sub> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, Sub> Copy for StateAccessor<S, Sub> {}
