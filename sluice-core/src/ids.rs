use std::cell::Cell;

/// Rank is the sole scheduling key: every edge parent -> child has
/// `parent.rank() < child.rank()`, fixed at construction (§4.1).
pub type Rank = u32;

pub type NodeId = u64;
pub type TxnId = u64;
pub type SubId = u64;

thread_local! {
    static NEXT_NODE_ID: Cell<NodeId> = Cell::new(1);
    static NEXT_TXN_ID: Cell<TxnId> = Cell::new(1);
    static NEXT_SUB_ID: Cell<SubId> = Cell::new(1);
}

pub(crate) fn next_node_id() -> NodeId {
    NEXT_NODE_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}

pub(crate) fn next_txn_id() -> TxnId {
    NEXT_TXN_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}

pub(crate) fn next_sub_id() -> SubId {
    NEXT_SUB_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}
