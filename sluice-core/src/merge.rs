// Merge stream (§4.4): the union of N same-typed parent streams. Firing
// and re-entry live on `Node<T>` itself (it is its own `Observer<T>`,
// see node.rs); this module is just the constructor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::ids::SubId;
use crate::node::{Kind, Lifecycle, Node};

pub(crate) fn merge<T: Clone + 'static>(parents: Vec<Rc<Node<T>>>) -> Rc<Node<T>> {
    assert!(!parents.is_empty(), "merge requires at least one parent stream");
    let rank = parents.iter().map(|p| p.rank).max().unwrap() + 1;

    let sub_ids: Rc<RefCell<Vec<SubId>>> = Rc::new(RefCell::new(Vec::new()));
    let (parents_start, ids_start) = (parents.clone(), sub_ids.clone());
    let (parents_stop, ids_stop) = (parents.clone(), sub_ids.clone());

    let lifecycle = Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let mut ids = ids_start.borrow_mut();
            for parent in &parents_start {
                let obs: Rc<dyn crate::node::Observer<T>> = child.clone();
                ids.push(parent.add_internal_observer(obs));
            }
        }),
        on_stop: Box::new(move |_child| {
            let mut ids = ids_stop.borrow_mut();
            for (parent, id) in parents_stop.iter().zip(ids.drain(..)) {
                parent.remove_internal_observer(id);
            }
        }),
    };

    Node::new_rc(rank, false, Kind::Merge(RefCell::new(VecDeque::new())), lifecycle)
}
