use super::{Dom, NodeId};
use crate::parser::css::{
    parse_selector, Combinator, ComplexSelector, CompoundSelector, PseudoClass, SelectorError,
    SelectorList,
};

impl Dom {
    /// All elements under `scope` matching `selector`, in document order.
    ///
    /// Matching is evaluated against the whole tree, as `querySelectorAll`
    /// does: ancestors outside `scope` still satisfy combinators.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = parse_selector(selector)?;
        Ok(self.select_all(scope, &list))
    }

    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let list = parse_selector(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|&id| self.matches(id, &list)))
    }

    pub fn select_all(&self, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, list))
            .collect()
    }

    /// Nearest inclusive ancestor of `id` matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let list = parse_selector(selector)?;
        Ok(std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&candidate| self.matches(candidate, &list)))
    }

    pub fn matches(&self, id: NodeId, list: &SelectorList) -> bool {
        self.element(id).is_some() && list.0.iter().any(|complex| self.matches_complex(id, complex))
    }

    fn matches_complex(&self, id: NodeId, selector: &ComplexSelector) -> bool {
        match selector.compounds.len() {
            0 => false,
            n => self.matches_at(id, &selector.compounds, n - 1),
        }
    }

    // Right-to-left with backtracking over descendant combinators.
    fn matches_at(&self, id: NodeId, compounds: &[(Combinator, CompoundSelector)], idx: usize) -> bool {
        let (combinator, compound) = &compounds[idx];
        if !self.matches_compound(id, compound) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => self
                .parent(id)
                .is_some_and(|p| self.matches_at(p, compounds, idx - 1)),
            Combinator::Descendant => self
                .ancestors(id)
                .any(|a| self.matches_at(a, compounds, idx - 1)),
        }
    }

    fn matches_compound(&self, id: NodeId, compound: &CompoundSelector) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };

        if let Some(tag) = &compound.tag {
            if !el.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(wanted) = &compound.id {
            if el.attr("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        if !compound.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        for attr in &compound.attributes {
            match (el.attr(&attr.name), &attr.value) {
                (None, _) => return false,
                (Some(actual), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }
        compound.pseudo_classes.iter().all(|pseudo| match pseudo {
            PseudoClass::FirstChild => self.preceding_elements(id).next().is_none(),
            PseudoClass::FirstOfType => !self
                .preceding_elements(id)
                .any(|sibling| self.tag_name(sibling) == Some(el.tag_name.as_str())),
        })
    }

    fn preceding_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings = self.parent(id).map(|p| self.children(p)).unwrap_or(&[]);
        siblings
            .iter()
            .copied()
            .take_while(move |&s| s != id)
            .filter(move |&s| self.nodes[s].is_element())
    }
}
