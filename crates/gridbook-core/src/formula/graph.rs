//! The formula dependency graph and recalculation scheduler.
//!
//! Tracks, per formula cell, the set of cells it reads and the reverse
//! edges. Recalculation takes the transitive closure of dependents from a
//! changed set by breadth-first search, then topologically sorts that
//! closure with a three-colour depth-first visit; a grey-on-grey edge is a
//! circular reference.

use std::collections::{HashMap, HashSet, VecDeque};

use gridbook_xml::cell_ref::CellRef;

use crate::error::{FormulaError, FormulaResult};

/// Forward and reverse dependency edges between cells.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// cell -> cells it reads
    dependencies: HashMap<CellRef, HashSet<CellRef>>,
    /// cell -> cells that read it
    dependents: HashMap<CellRef, HashSet<CellRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a formula cell and the references it reads. Re-adding a cell
    /// replaces its previous edges.
    pub fn add_formula(&mut self, cell: CellRef, refs: &[CellRef]) {
        self.remove_formula(&cell);
        let unique: HashSet<CellRef> = refs.iter().copied().collect();
        for dep in &unique {
            self.dependents.entry(*dep).or_default().insert(cell);
        }
        self.dependencies.insert(cell, unique);
    }

    /// Remove a formula cell and its outgoing edges. Cells depending on it
    /// keep their edges; only what this cell reads is forgotten.
    pub fn remove_formula(&mut self, cell: &CellRef) {
        if let Some(deps) = self.dependencies.remove(cell) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(cell);
                    if set.is_empty() {
                        self.dependents.remove(&dep);
                    }
                }
            }
        }
    }

    /// Cells that directly read `cell`, sorted for determinism.
    pub fn direct_dependents(&self, cell: &CellRef) -> Vec<CellRef> {
        sorted(self.dependents.get(cell))
    }

    /// Cells that `cell` directly reads, sorted for determinism.
    pub fn direct_dependencies(&self, cell: &CellRef) -> Vec<CellRef> {
        sorted(self.dependencies.get(cell))
    }

    /// The order in which formula cells must recalculate after the given
    /// cells change: every affected cell appears after all of its
    /// dependencies within the order.
    pub fn recalculation_order(&self, changed: &[CellRef]) -> FormulaResult<Vec<CellRef>> {
        let reachable = self.reachable_dependents(changed);

        let mut color: HashMap<CellRef, Color> = HashMap::new();
        let mut order: Vec<CellRef> = Vec::new();

        let mut roots: Vec<CellRef> = reachable.iter().copied().collect();
        roots.sort();
        for root in roots {
            self.visit(root, &reachable, &mut color, &mut order)?;
        }

        order.reverse();
        Ok(order)
    }

    /// Whether evaluating any of the given cells would loop.
    pub fn has_circular_reference(&self, cells: &[CellRef]) -> bool {
        self.recalculation_order(cells).is_err()
    }

    /// BFS over dependent edges from the changed set.
    fn reachable_dependents(&self, changed: &[CellRef]) -> HashSet<CellRef> {
        let mut seen: HashSet<CellRef> = HashSet::new();
        let mut queue: VecDeque<CellRef> = VecDeque::new();

        for cell in changed {
            // A changed cell recalculates itself only if it holds a formula.
            if self.dependencies.contains_key(cell) {
                seen.insert(*cell);
            }
            queue.push_back(*cell);
        }

        while let Some(cell) = queue.pop_front() {
            if let Some(deps) = self.dependents.get(&cell) {
                for dependent in deps {
                    if seen.insert(*dependent) {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
        seen
    }

    /// Iterative three-colour DFS along dependent edges; nodes outside the
    /// reachable set are not visited.
    fn visit(
        &self,
        root: CellRef,
        reachable: &HashSet<CellRef>,
        color: &mut HashMap<CellRef, Color>,
        order: &mut Vec<CellRef>,
    ) -> FormulaResult<()> {
        if color.get(&root) == Some(&Color::Done) {
            return Ok(());
        }

        let mut stack: Vec<(CellRef, bool)> = vec![(root, false)];
        while let Some((cell, children_done)) = stack.pop() {
            if children_done {
                color.insert(cell, Color::Done);
                order.push(cell);
                continue;
            }
            match color.get(&cell) {
                Some(Color::Done) => continue,
                Some(Color::InProgress) => {
                    return Err(FormulaError::CircularReference {
                        cell: cell.to_string(),
                    });
                }
                None => {}
            }
            color.insert(cell, Color::InProgress);
            stack.push((cell, true));

            for next in self.direct_dependents(&cell) {
                if !reachable.contains(&next) {
                    continue;
                }
                match color.get(&next) {
                    Some(Color::Done) => {}
                    Some(Color::InProgress) => {
                        return Err(FormulaError::CircularReference {
                            cell: next.to_string(),
                        });
                    }
                    None => stack.push((next, false)),
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    InProgress,
    Done,
}

fn sorted(set: Option<&HashSet<CellRef>>) -> Vec<CellRef> {
    let mut cells: Vec<CellRef> = set.map(|s| s.iter().copied().collect()).unwrap_or_default();
    cells.sort();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    /// B1 = A1+1, C1 = B1*2, D1 = A1+C1.
    fn diamond() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_formula(cell("B1"), &[cell("A1")]);
        graph.add_formula(cell("C1"), &[cell("B1")]);
        graph.add_formula(cell("D1"), &[cell("A1"), cell("C1")]);
        graph
    }

    #[test]
    fn test_direct_edges() {
        let graph = diamond();
        assert_eq!(graph.direct_dependents(&cell("A1")), vec![cell("B1"), cell("D1")]);
        assert_eq!(graph.direct_dependencies(&cell("D1")), vec![cell("A1"), cell("C1")]);
        assert!(graph.direct_dependents(&cell("Z9")).is_empty());
    }

    #[test]
    fn test_recalculation_order_respects_dependencies() {
        let graph = diamond();
        let order = graph.recalculation_order(&[cell("A1")]).unwrap();
        assert_eq!(order.len(), 3);
        let pos = |c: &str| order.iter().position(|x| *x == cell(c)).unwrap();
        assert!(pos("B1") < pos("C1"));
        assert!(pos("C1") < pos("D1"));
    }

    #[test]
    fn test_recalculation_only_covers_reachable_cells() {
        let mut graph = diamond();
        // An unrelated chain never shows up.
        graph.add_formula(cell("X1"), &[cell("Y1")]);
        let order = graph.recalculation_order(&[cell("B1")]).unwrap();
        assert_eq!(order.len(), 3); // B1, C1, D1
        assert!(!order.contains(&cell("X1")));
    }

    #[test]
    fn test_changed_plain_cell_is_not_in_order() {
        let graph = diamond();
        // A1 holds no formula, so it only triggers, it does not recalculate.
        let order = graph.recalculation_order(&[cell("A1")]).unwrap();
        assert!(!order.contains(&cell("A1")));
    }

    #[test]
    fn test_remove_formula() {
        let mut graph = diamond();
        graph.remove_formula(&cell("D1"));
        let order = graph.recalculation_order(&[cell("A1")]).unwrap();
        assert_eq!(order, vec![cell("B1"), cell("C1")]);
    }

    #[test]
    fn test_re_adding_replaces_edges() {
        let mut graph = diamond();
        graph.add_formula(cell("B1"), &[cell("E5")]);
        let order = graph.recalculation_order(&[cell("A1")]).unwrap();
        // B1 no longer depends on A1; D1 still does.
        assert_eq!(order, vec![cell("D1")]);
        let from_e5 = graph.recalculation_order(&[cell("E5")]).unwrap();
        let pos = |order: &[CellRef], c: &str| order.iter().position(|x| *x == cell(c)).unwrap();
        assert!(pos(&from_e5, "B1") < pos(&from_e5, "C1"));
    }

    #[test]
    fn test_direct_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_formula(cell("A1"), &[cell("B1")]);
        graph.add_formula(cell("B1"), &[cell("A1")]);
        let err = graph.recalculation_order(&[cell("A1")]).unwrap_err();
        assert!(matches!(err, FormulaError::CircularReference { .. }));
        assert!(graph.has_circular_reference(&[cell("A1")]));
    }

    #[test]
    fn test_self_reference_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_formula(cell("A1"), &[cell("A1")]);
        assert!(graph.has_circular_reference(&[cell("A1")]));
    }

    #[test]
    fn test_long_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_formula(cell("A1"), &[cell("C1")]);
        graph.add_formula(cell("B1"), &[cell("A1")]);
        graph.add_formula(cell("C1"), &[cell("B1")]);
        assert!(graph.has_circular_reference(&[cell("A1")]));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        assert!(!diamond().has_circular_reference(&[cell("A1")]));
    }

    #[test]
    fn test_deterministic_order() {
        let graph = diamond();
        let a = graph.recalculation_order(&[cell("A1")]).unwrap();
        let b = graph.recalculation_order(&[cell("A1")]).unwrap();
        assert_eq!(a, b);
    }
}
