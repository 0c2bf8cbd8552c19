use crate::{
    error::FilterError,
    rule::{Rule, RuleId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Every child must hold.
    All,
    /// At least one child must hold.
    Any,
    /// No child may hold.
    None,
}

/// An ordered group of child rules combined by its [`ChainKind`].
#[derive(Debug)]
pub struct Chain {
    id: RuleId,
    kind: ChainKind,
    children: Vec<Rule>,
}

impl Chain {
    pub fn new(kind: ChainKind) -> Self {
        Self {
            id: RuleId::next(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with(mut self, children: impl IntoIterator<Item = Rule>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn add(&mut self, rule: impl Into<Rule>) -> &mut Self {
        self.children.push(rule.into());
        self
    }

    pub fn insert_before(
        &mut self,
        reference: RuleId,
        rule: impl Into<Rule>,
    ) -> Result<&mut Self, FilterError> {
        let index = self.position(reference)?;
        self.children.insert(index, rule.into());
        Ok(self)
    }

    pub fn insert_after(
        &mut self,
        reference: RuleId,
        rule: impl Into<Rule>,
    ) -> Result<&mut Self, FilterError> {
        let index = self.position(reference)?;
        self.children.insert(index + 1, rule.into());
        Ok(self)
    }

    /// Swaps the child `old` for `new` in place and returns the old child.
    pub fn replace(&mut self, old: RuleId, new: impl Into<Rule>) -> Result<Rule, FilterError> {
        let index = self.position(old)?;
        Ok(std::mem::replace(&mut self.children[index], new.into()))
    }

    /// Detaches the child `rule`. Unknown ids are ignored.
    pub fn remove(&mut self, rule: RuleId) -> Option<Rule> {
        let index = self.children.iter().position(|c| c.id() == rule)?;
        Some(self.children.remove(index))
    }

    pub fn has(&self, rule: RuleId) -> bool {
        self.children.iter().any(|c| c.id() == rule)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[Rule] {
        &self.children
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Rule> {
        self.children.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.children.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Rule> {
        self.children.iter_mut()
    }

    fn position(&self, rule: RuleId) -> Result<usize, FilterError> {
        self.children
            .iter()
            .position(|c| c.id() == rule)
            .ok_or(FilterError::NotFound(rule))
    }
}

impl Clone for Chain {
    fn clone(&self) -> Self {
        Self {
            id: RuleId::next(),
            kind: self.kind,
            children: self.children.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Chain, ChainKind};
    use crate::{error::FilterError, rule::Rule};

    fn ids(chain: &Chain) -> Vec<crate::rule::RuleId> {
        chain.iter().map(Rule::id).collect()
    }

    #[test]
    fn test_insert_before_and_after_reference() {
        let a = Rule::equal("a", 1i64);
        let b = Rule::equal("b", 2i64);
        let (a_id, b_id) = (a.id(), b.id());
        let mut chain = Chain::new(ChainKind::All).with([a, b]);

        let x = Rule::equal("x", 0i64);
        let x_id = x.id();
        chain.insert_before(b_id, x).unwrap();
        let y = Rule::equal("y", 0i64);
        let y_id = y.id();
        chain.insert_after(a_id, y).unwrap();

        assert_eq!(ids(&chain), vec![a_id, y_id, x_id, b_id]);
    }

    #[test]
    fn test_insert_with_unknown_reference_fails() {
        let stranger = Rule::equal("z", 0i64);
        let mut chain = Chain::new(ChainKind::Any).with([Rule::equal("a", 1i64)]);

        let err = chain
            .insert_before(stranger.id(), Rule::equal("b", 1i64))
            .unwrap_err();
        assert!(matches!(err, FilterError::NotFound(id) if id == stranger.id()));
        assert_eq!(chain.count(), 1);
    }

    #[test]
    fn test_replace_keeps_position_and_returns_old_child() {
        let a = Rule::equal("a", 1i64);
        let b = Rule::equal("b", 2i64);
        let (a_id, b_id) = (a.id(), b.id());
        let mut chain = Chain::new(ChainKind::All).with([a, b]);

        let c = Rule::equal("c", 3i64);
        let c_id = c.id();
        let old = chain.replace(a_id, c).unwrap();

        assert_eq!(old.id(), a_id);
        assert_eq!(ids(&chain), vec![c_id, b_id]);
        assert!(!chain.has(a_id));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let a = Rule::equal("a", 1i64);
        let stranger = Rule::equal("a", 1i64);
        let mut chain = Chain::new(ChainKind::None).with([a]);

        assert!(chain.remove(stranger.id()).is_none());
        assert_eq!(chain.count(), 1);
    }

    #[test]
    fn test_equal_conditions_are_distinct_nodes() {
        let first = Rule::equal("a", 1i64);
        let second = Rule::equal("a", 1i64);
        let (first_id, second_id) = (first.id(), second.id());
        let mut chain = Chain::new(ChainKind::All).with([first, second]);

        chain.remove(second_id);
        assert!(chain.has(first_id));
        assert!(!chain.has(second_id));
    }

    #[test]
    fn test_clone_assigns_fresh_ids_throughout() {
        let chain = Chain::new(ChainKind::Any).with([Rule::equal("a", 1i64)]);
        let copy = chain.clone();

        assert_ne!(copy.id(), chain.id());
        assert_ne!(copy.children()[0].id(), chain.children()[0].id());
        assert_eq!(copy.kind(), ChainKind::Any);
    }
}
