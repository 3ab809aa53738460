//! The in-memory UTXO viewpoint.
//!
//! A `UtxoView` maps outpoints to entries and tracks three entry states:
//! unspent, spent (marked, not deleted, so a disconnect can restore it
//! without touching disk), and disapproved (created by a regular-tree
//! transaction whose block was disapproved by its successor's vote
//! bits). Spent and disapproved entries are invisible to lookups even
//! though they remain materially present.

use std::collections::HashMap;

use var_chain::{
    asset::AssetId,
    block::Height,
    stake::TxType,
    transaction::Transaction,
    transparent::{EntryFlags, OutPoint, Tree, UtxoEntry},
};

/// Errors raised while applying transactions to a [`UtxoView`].
#[derive(displaydoc::Display, thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum UtxoError {
    /// transparent input {0:?} not found or already spent
    MissingUtxo(OutPoint),
    /// transaction would recreate existing output {0:?}
    DuplicateUtxo(OutPoint),
    /// undo data does not match the view contents for {0:?}
    UndoMismatch(OutPoint),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Slot {
    Unspent(UtxoEntry),
    Spent(UtxoEntry),
    Disapproved(UtxoEntry),
}

/// The undo record of one applied transaction: everything needed to
/// reverse it exactly.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TxUndo {
    /// The entries consumed by the transaction, in input order.
    pub spent: Vec<(OutPoint, UtxoEntry)>,
    /// The outpoints created by the transaction.
    pub created: Vec<OutPoint>,
}

/// An in-memory mapping from outpoint to unspent output entry.
///
/// The view is owned by the single chain writer; readers receive
/// snapshot clones.
#[derive(Clone, Debug, Default)]
pub struct UtxoView {
    entries: HashMap<OutPoint, Slot>,
}

impl UtxoView {
    pub fn new() -> UtxoView {
        UtxoView::default()
    }

    /// The unspent entry for `outpoint`, if visible.
    ///
    /// Spent and disapproved entries return `None`.
    pub fn lookup(&self, outpoint: &OutPoint) -> Option<&UtxoEntry> {
        match self.entries.get(outpoint) {
            Some(Slot::Unspent(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Adds an unspent entry directly, bypassing transaction application.
    ///
    /// Used when seeding a view from the finalized store.
    pub fn insert_entry(&mut self, outpoint: OutPoint, entry: UtxoEntry) {
        self.entries.insert(outpoint, Slot::Unspent(entry));
    }

    /// Consumes the entries referenced by `tx`'s inputs and creates one
    /// entry per output.
    ///
    /// The application is atomic: inputs are verified before any
    /// mutation, so an error leaves the view untouched.
    pub fn apply_transaction(
        &mut self,
        tx: &Transaction,
        tree: Tree,
        height: Height,
        block_index: u32,
        tx_type: TxType,
    ) -> Result<TxUndo, UtxoError> {
        let tx_hash = tx.hash();

        // Verify before mutating. A repeated outpoint is a double spend
        // even inside one transaction.
        let mut spends = std::collections::HashSet::new();
        for input in tx.inputs.iter().filter(|input| !input.is_null()) {
            if self.lookup(&input.previous_outpoint).is_none()
                || !spends.insert(input.previous_outpoint)
            {
                return Err(UtxoError::MissingUtxo(input.previous_outpoint));
            }
        }
        for index in 0..tx.outputs.len() {
            let outpoint = OutPoint {
                hash: tx_hash,
                index: index as u32,
                tree,
            };
            if self.entries.contains_key(&outpoint) {
                return Err(UtxoError::DuplicateUtxo(outpoint));
            }
        }

        let mut flags = EntryFlags::empty();
        if tx_type == TxType::Coinbase {
            flags |= EntryFlags::COINBASE;
        }
        if tx.has_expiry() {
            flags |= EntryFlags::HAS_EXPIRY;
        }

        let mut undo = TxUndo::default();
        for input in tx.inputs.iter().filter(|input| !input.is_null()) {
            let outpoint = input.previous_outpoint;
            let entry = match self.entries.remove(&outpoint) {
                Some(Slot::Unspent(entry)) => entry,
                _ => unreachable!("inputs were verified unspent above"),
            };
            undo.spent.push((outpoint, entry.clone()));
            self.entries.insert(outpoint, Slot::Spent(entry));
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint {
                hash: tx_hash,
                index: index as u32,
                tree,
            };
            let entry = UtxoEntry {
                output: output.clone(),
                height,
                block_index,
                flags,
                tx_type,
            };
            self.entries.insert(outpoint, Slot::Unspent(entry));
            undo.created.push(outpoint);
        }
        Ok(undo)
    }

    /// Reverses a previous [`apply_transaction`], restoring consumed
    /// entries and removing created ones.
    ///
    /// [`apply_transaction`]: UtxoView::apply_transaction
    pub fn undo_transaction(&mut self, undo: &TxUndo) -> Result<(), UtxoError> {
        for outpoint in undo.created.iter().rev() {
            if self.entries.remove(outpoint).is_none() {
                return Err(UtxoError::UndoMismatch(*outpoint));
            }
        }
        for (outpoint, entry) in undo.spent.iter().rev() {
            match self.entries.insert(*outpoint, Slot::Unspent(entry.clone())) {
                Some(Slot::Spent(_)) | None => {}
                _ => return Err(UtxoError::UndoMismatch(*outpoint)),
            }
        }
        Ok(())
    }

    /// Hides every regular-tree entry created at `height`.
    ///
    /// Called when the next block's vote bits disapprove its parent:
    /// the parent's regular-tree outputs never take effect. Returns the
    /// outpoints hidden, so a disconnect can restore them.
    pub fn disapprove_regular_tree(&mut self, height: Height) -> Vec<OutPoint> {
        let mut hidden = Vec::new();
        for (outpoint, slot) in self.entries.iter_mut() {
            if outpoint.tree != Tree::Regular {
                continue;
            }
            if let Slot::Unspent(entry) = slot {
                if entry.height == height {
                    let entry = entry.clone();
                    *slot = Slot::Disapproved(entry);
                    hidden.push(*outpoint);
                }
            }
        }
        hidden
    }

    /// Reverses [`disapprove_regular_tree`] for the given outpoints.
    ///
    /// [`disapprove_regular_tree`]: UtxoView::disapprove_regular_tree
    pub fn restore_disapproved(&mut self, outpoints: &[OutPoint]) -> Result<(), UtxoError> {
        for outpoint in outpoints {
            let slot = self
                .entries
                .get_mut(outpoint)
                .ok_or(UtxoError::UndoMismatch(*outpoint))?;
            match slot {
                Slot::Disapproved(entry) => {
                    let entry = entry.clone();
                    *slot = Slot::Unspent(entry);
                }
                _ => return Err(UtxoError::UndoMismatch(*outpoint)),
            }
        }
        Ok(())
    }

    /// Iterates the visible entries carrying `asset_id`.
    pub fn by_asset(&self, asset_id: AssetId) -> impl Iterator<Item = (&OutPoint, &UtxoEntry)> {
        self.entries.iter().filter_map(move |(outpoint, slot)| match slot {
            Slot::Unspent(entry) if entry.asset_id() == asset_id => Some((outpoint, entry)),
            _ => None,
        })
    }

    /// The total visible atoms of `asset_id`.
    pub fn balance(&self, asset_id: AssetId) -> i64 {
        self.by_asset(asset_id)
            .map(|(_, entry)| entry.value().atoms())
            .sum()
    }

    /// The number of visible entries carrying `asset_id`.
    pub fn count(&self, asset_id: AssetId) -> usize {
        self.by_asset(asset_id).count()
    }

    /// The number of tracked outpoints, including spent markers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use var_chain::{
        amount::Amount,
        transaction::LockTime,
        transparent::{pay_to_pubkey_hash, Input, Output, Script},
    };

    fn output(value: i64, asset_id: AssetId) -> Output {
        Output {
            value: Amount::try_from(value).expect("valid test amount"),
            asset_id,
            script_version: 0,
            pk_script: pay_to_pubkey_hash([0x44; 20]),
        }
    }

    fn coinbase(values: Vec<(i64, AssetId)>) -> Transaction {
        Transaction::new(
            1,
            vec![Input::null(Script(Vec::new()))],
            values.into_iter().map(|(v, a)| output(v, a)).collect(),
            LockTime::unlocked(),
            0,
        )
    }

    fn spend(outpoint: OutPoint, outputs: Vec<(i64, AssetId)>) -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                previous_outpoint: outpoint,
                sequence: 0,
                value_in: 0,
                block_height: 0,
                block_index: 0,
                signature_script: Script(vec![0x51]),
            }],
            outputs.into_iter().map(|(v, a)| output(v, a)).collect(),
            LockTime::unlocked(),
            0,
        )
    }

    #[test]
    fn apply_creates_and_spend_consumes() {
        var_test::init();

        let mut view = UtxoView::new();
        let base = coinbase(vec![(50, AssetId::VAR), (10, AssetId(1))]);
        view.apply_transaction(&base, Tree::Regular, Height(1), 0, TxType::Coinbase)
            .expect("apply coinbase");

        assert_eq!(view.balance(AssetId::VAR), 50);
        assert_eq!(view.balance(AssetId(1)), 10);
        assert_eq!(view.count(AssetId(1)), 1);

        let outpoint = OutPoint {
            hash: base.hash(),
            index: 0,
            tree: Tree::Regular,
        };
        let tx = spend(outpoint, vec![(40, AssetId::VAR)]);
        view.apply_transaction(&tx, Tree::Regular, Height(2), 1, TxType::Regular)
            .expect("apply spend");

        // the consumed entry is marked spent, not deleted
        assert!(view.lookup(&outpoint).is_none());
        assert_eq!(view.balance(AssetId::VAR), 40);

        // double spends fail
        let double = spend(outpoint, vec![(1, AssetId::VAR)]);
        assert_eq!(
            view.apply_transaction(&double, Tree::Regular, Height(3), 1, TxType::Regular),
            Err(UtxoError::MissingUtxo(outpoint))
        );
    }

    #[test]
    fn undo_restores_the_previous_view() {
        var_test::init();

        let mut view = UtxoView::new();
        let base = coinbase(vec![(50, AssetId::VAR)]);
        view.apply_transaction(&base, Tree::Regular, Height(1), 0, TxType::Coinbase)
            .expect("apply coinbase");

        let outpoint = OutPoint {
            hash: base.hash(),
            index: 0,
            tree: Tree::Regular,
        };
        let tx = spend(outpoint, vec![(30, AssetId::VAR), (19, AssetId::VAR)]);
        let undo = view
            .apply_transaction(&tx, Tree::Regular, Height(2), 1, TxType::Regular)
            .expect("apply spend");

        assert_eq!(view.count(AssetId::VAR), 2);

        view.undo_transaction(&undo).expect("undo applies cleanly");
        assert_eq!(view.count(AssetId::VAR), 1);
        assert_eq!(view.balance(AssetId::VAR), 50);
        assert!(view.lookup(&outpoint).is_some());
    }

    #[test]
    fn disapproved_entries_are_invisible_until_restored() {
        var_test::init();

        let mut view = UtxoView::new();
        let tx = coinbase(vec![(25, AssetId::VAR)]);
        view.apply_transaction(&tx, Tree::Regular, Height(5), 0, TxType::Coinbase)
            .expect("apply");

        let hidden = view.disapprove_regular_tree(Height(5));
        assert_eq!(hidden.len(), 1);
        assert_eq!(view.balance(AssetId::VAR), 0);
        assert!(view.lookup(&hidden[0]).is_none());
        // still materially present
        assert_eq!(view.len(), 1);

        view.restore_disapproved(&hidden).expect("restore");
        assert_eq!(view.balance(AssetId::VAR), 25);
    }

    #[test]
    fn stake_tree_entries_survive_disapproval() {
        var_test::init();

        let mut view = UtxoView::new();
        let tx = coinbase(vec![(25, AssetId::VAR)]);
        view.apply_transaction(&tx, Tree::Stake, Height(5), 0, TxType::Vote)
            .expect("apply");

        assert!(view.disapprove_regular_tree(Height(5)).is_empty());
        assert_eq!(view.balance(AssetId::VAR), 25);
    }
}
