use crate::dataset::Dataset;
use permutohedron::LexicalPermutation;
use rio_raptor_api::model::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// A statement seen from one of its blank nodes: the blank node positions are
/// replaced by whether they are this node or another one.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
enum Position<'a> {
    This,
    Other,
    Subject(&'a Subject),
    Term(&'a Term),
    GraphName(Option<&'a GraphName>),
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
struct Occurrence<'a> {
    subject: Position<'a>,
    predicate: &'a NamedNode,
    object: Position<'a>,
    graph_name: Position<'a>,
}

fn occurrence<'a>(statement: &'a Statement, node: &BlankNode) -> Occurrence<'a> {
    Occurrence {
        subject: match &statement.subject {
            Subject::BlankNode(n) if n == node => Position::This,
            Subject::BlankNode(_) => Position::Other,
            subject => Position::Subject(subject),
        },
        predicate: &statement.predicate,
        object: match &statement.object {
            Term::BlankNode(n) if n == node => Position::This,
            Term::BlankNode(_) => Position::Other,
            object => Position::Term(object),
        },
        graph_name: match &statement.graph_name {
            Some(GraphName::BlankNode(n)) if n == node => Position::This,
            Some(GraphName::BlankNode(_)) => Position::Other,
            graph_name => Position::GraphName(graph_name.as_ref()),
        },
    }
}

fn hash_blank_nodes<'a>(
    bnodes: HashSet<&'a BlankNode>,
    dataset: &'a Dataset,
) -> HashMap<u64, Vec<&'a BlankNode>> {
    let mut bnodes_by_hash = HashMap::default();

    // NB: occurrences are sorted to get the same hash in both datasets
    for bnode in bnodes {
        let mut hasher = DefaultHasher::new();
        let occurrences: BTreeSet<Occurrence<'_>> = dataset
            .statements_mentioning(bnode)
            .map(|s| occurrence(s, bnode))
            .collect();
        for occurrence in occurrences {
            occurrence.hash(&mut hasher);
        }
        bnodes_by_hash
            .entry(hasher.finish())
            .or_insert_with(Vec::default)
            .push(bnode);
    }
    bnodes_by_hash
}

fn build_and_check_containment_from_hashes<'a>(
    hashes_to_see: &mut Vec<&u64>,
    a_bnodes_by_hash: &'a HashMap<u64, Vec<&'a BlankNode>>,
    b_bnodes_by_hash: &'a HashMap<u64, Vec<&'a BlankNode>>,
    a_to_b_mapping: &mut HashMap<&'a BlankNode, &'a BlankNode>,
    a: &Dataset,
    b: &Dataset,
) -> bool {
    let hash = match hashes_to_see.pop() {
        Some(h) => h,
        None => return check_is_contained(a_to_b_mapping, a, b),
    };

    let a_nodes: &[&BlankNode] = a_bnodes_by_hash
        .get(hash)
        .map_or(&[], |v| v.as_slice());
    let b_nodes: &[&BlankNode] = b_bnodes_by_hash
        .get(hash)
        .map_or(&[], |v| v.as_slice());
    if a_nodes.len() != b_nodes.len() {
        return false;
    }
    if a_nodes.len() == 1 {
        a_to_b_mapping.insert(a_nodes[0], b_nodes[0]);
        let result = build_and_check_containment_from_hashes(
            hashes_to_see,
            a_bnodes_by_hash,
            b_bnodes_by_hash,
            a_to_b_mapping,
            a,
            b,
        );
        a_to_b_mapping.remove(a_nodes[0]);
        hashes_to_see.push(hash);
        result
    } else {
        // Every permutation of a_nodes zipped with b_nodes gives a candidate mapping
        let mut a_nodes_rotated = a_nodes.to_vec();
        a_nodes_rotated.sort();
        loop {
            for (a_node, b_node) in a_nodes_rotated.iter().zip(b_nodes.iter()) {
                a_to_b_mapping.insert(a_node, b_node);
            }
            let result = if build_and_check_containment_from_hashes(
                hashes_to_see,
                a_bnodes_by_hash,
                b_bnodes_by_hash,
                a_to_b_mapping,
                a,
                b,
            ) {
                Some(true)
            } else if !a_nodes_rotated.next_permutation() {
                Some(false)
            } else {
                None
            };

            if let Some(result) = result {
                for a_node in &a_nodes_rotated {
                    a_to_b_mapping.remove(a_node);
                }
                hashes_to_see.push(hash);
                return result;
            }
        }
    }
}

fn relabel(statement: &Statement, mapping: &HashMap<&BlankNode, &BlankNode>) -> Statement {
    let map = |node: &BlankNode| mapping.get(node).map_or_else(|| node.clone(), |n| (*n).clone());
    Statement {
        subject: match &statement.subject {
            Subject::BlankNode(node) => map(node).into(),
            subject => subject.clone(),
        },
        predicate: statement.predicate.clone(),
        object: match &statement.object {
            Term::BlankNode(node) => map(node).into(),
            object => object.clone(),
        },
        graph_name: match &statement.graph_name {
            Some(GraphName::BlankNode(node)) => Some(map(node).into()),
            graph_name => graph_name.clone(),
        },
    }
}

fn check_is_contained(
    a_to_b_mapping: &HashMap<&BlankNode, &BlankNode>,
    a: &Dataset,
    b: &Dataset,
) -> bool {
    a.iter().all(|s| b.contains(&relabel(s, a_to_b_mapping)))
}

fn has_blank_node(statement: &Statement) -> bool {
    matches!(statement.subject, Subject::BlankNode(_))
        || matches!(statement.object, Term::BlankNode(_))
        || matches!(statement.graph_name, Some(GraphName::BlankNode(_)))
}

/// Checks that `a` and `b` are equal up to a renaming of their blank nodes.
pub fn are_datasets_isomorphic(a: &Dataset, b: &Dataset) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a
        .iter()
        .any(|s| !has_blank_node(s) && !b.contains(s))
    {
        return false;
    }

    let a_bnodes_by_hash = hash_blank_nodes(a.blank_nodes(), a);
    let b_bnodes_by_hash = hash_blank_nodes(b.blank_nodes(), b);

    // Hashes should have the same size everywhere
    if a_bnodes_by_hash.len() != b_bnodes_by_hash.len() {
        return false;
    }
    for hash in a_bnodes_by_hash.keys() {
        if a_bnodes_by_hash.get(hash).map(|l| l.len())
            != b_bnodes_by_hash.get(hash).map(|l| l.len())
        {
            return false;
        }
    }

    build_and_check_containment_from_hashes(
        &mut a_bnodes_by_hash.keys().collect(),
        &a_bnodes_by_hash,
        &b_bnodes_by_hash,
        &mut HashMap::default(),
        a,
        b,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.com/{}", name)).unwrap()
    }

    #[test]
    fn blank_nodes_are_relabeled() {
        let a: Dataset = vec![
            Statement::new(BlankNode::new_unchecked("a"), ex("p"), BlankNode::new_unchecked("b")),
            Statement::new(BlankNode::new_unchecked("b"), ex("q"), ex("o")),
        ]
        .into_iter()
        .collect();
        let b: Dataset = vec![
            Statement::new(BlankNode::fresh(), ex("q"), ex("o")),
            Statement::new(BlankNode::new_unchecked("x"), ex("p"), BlankNode::new_unchecked("y")),
            Statement::new(BlankNode::new_unchecked("y"), ex("q"), ex("o")),
        ]
        .into_iter()
        .collect();
        assert!(!are_datasets_isomorphic(&a, &b));

        let b: Dataset = vec![
            Statement::new(BlankNode::new_unchecked("x"), ex("p"), BlankNode::new_unchecked("y")),
            Statement::new(BlankNode::new_unchecked("y"), ex("q"), ex("o")),
        ]
        .into_iter()
        .collect();
        assert!(are_datasets_isomorphic(&a, &b));
    }

    #[test]
    fn graph_names_are_compared() {
        let a: Dataset = vec![Statement::new(ex("s"), ex("p"), ex("o")).in_graph(BlankNode::new_unchecked("g"))]
            .into_iter()
            .collect();
        let b: Dataset = vec![Statement::new(ex("s"), ex("p"), ex("o")).in_graph(BlankNode::new_unchecked("h"))]
            .into_iter()
            .collect();
        let c: Dataset = vec![Statement::new(ex("s"), ex("p"), ex("o")).in_graph(ex("g"))]
            .into_iter()
            .collect();
        assert!(are_datasets_isomorphic(&a, &b));
        assert!(!are_datasets_isomorphic(&a, &c));
    }

    #[test]
    fn symmetric_blank_nodes() {
        let cycle = |x: &str, y: &str| -> Dataset {
            vec![
                Statement::new(BlankNode::new_unchecked(x), ex("p"), BlankNode::new_unchecked(y)),
                Statement::new(BlankNode::new_unchecked(y), ex("p"), BlankNode::new_unchecked(x)),
            ]
            .into_iter()
            .collect()
        };
        assert!(are_datasets_isomorphic(&cycle("a", "b"), &cycle("c", "d")));
    }
}
