use crate::crypto::sha256_hex;
use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Root of an empty transaction set: SHA-256 of the empty string.
pub const EMPTY_MERKLE_ROOT: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Merkle root over the transactions' hashes, in block order.
///
/// Parents are `sha256(left_hex + right_hex)`; an odd node is paired with itself.
pub fn merkle_root(transactions: &[Transaction]) -> Result<String, TransactionError> {
    let leaves = transactions
        .iter()
        .map(|tx| {
            tx.transaction_hash()
                .map(str::to_string)
                .ok_or(TransactionError::Unsigned)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(root_of(leaves))
}

fn root_of(mut level: Vec<String>) -> String {
    if level.is_empty() {
        return EMPTY_MERKLE_ROOT.to_string();
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                sha256_hex(format!("{left}{right}").as_bytes())
            })
            .collect();
    }
    level.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::model::tests::signed_tx;

    #[test]
    fn empty_set_uses_sentinel() {
        assert_eq!(merkle_root(&[]).unwrap(), EMPTY_MERKLE_ROOT);
        assert_eq!(sha256_hex(b""), EMPTY_MERKLE_ROOT);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let tx = signed_tx("solo");
        assert_eq!(
            merkle_root(std::slice::from_ref(&tx)).unwrap(),
            tx.transaction_hash().unwrap()
        );
    }

    #[test]
    fn odd_leaf_is_paired_with_itself() {
        let txs: Vec<_> = ["a", "b", "c"].iter().map(|p| signed_tx(p)).collect();
        let h: Vec<String> = txs
            .iter()
            .map(|t| t.transaction_hash().unwrap().to_string())
            .collect();
        let ab = sha256_hex(format!("{}{}", h[0], h[1]).as_bytes());
        let cc = sha256_hex(format!("{}{}", h[2], h[2]).as_bytes());
        let expected = sha256_hex(format!("{ab}{cc}").as_bytes());
        assert_eq!(merkle_root(&txs).unwrap(), expected);
    }

    #[test]
    fn order_matters() {
        let a = signed_tx("a");
        let b = signed_tx("b");
        assert_ne!(
            merkle_root(&[a.clone(), b.clone()]).unwrap(),
            merkle_root(&[b, a]).unwrap()
        );
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        let tx = Transaction::new("a".into(), "b".into(), "c".into());
        assert_eq!(merkle_root(&[tx]), Err(TransactionError::Unsigned));
    }
}
