//! Déplacement d'un élément dans une liste ordonnée
//!
//! L'élément est retiré puis réinséré à l'index cible ; les positions sont
//! toujours des index, jamais des valeurs.

use std::fmt;

/// Index hors limites pour un déplacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub from: usize,
    pub to: usize,
    pub len: usize,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot move entry {} to {} in a list of {} entries",
            self.from, self.to, self.len
        )
    }
}

impl std::error::Error for OutOfRange {}

/// Déplace `items[from]` pour qu'il se retrouve en position `to`
///
/// Les autres éléments gardent leur ordre relatif. `from == to` ne change rien.
/// Des valeurs égales dans la liste n'ont pas d'effet sur la position finale.
pub fn move_entry<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), OutOfRange> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(OutOfRange { from, to, len });
    }
    if from == to {
        return Ok(());
    }

    let moving = items.remove(from);
    items.insert(to, moving);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Vec<char> {
        vec!['a', 'b', 'c', 'd', 'e']
    }

    #[test]
    fn test_move_forward_and_back() {
        let mut items = letters();
        move_entry(&mut items, 1, 3).unwrap();
        assert_eq!(items, vec!['a', 'c', 'd', 'b', 'e']);

        move_entry(&mut items, 3, 1).unwrap();
        assert_eq!(items, letters());

        move_entry(&mut items, 4, 0).unwrap();
        assert_eq!(items, vec!['e', 'a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_same_index_is_noop() {
        let mut items = letters();
        move_entry(&mut items, 2, 2).unwrap();
        assert_eq!(items, letters());
    }

    #[test]
    fn test_out_of_range() {
        let mut items = letters();
        let err = move_entry(&mut items, 0, 5).unwrap_err();
        assert_eq!(err, OutOfRange { from: 0, to: 5, len: 5 });
        assert!(move_entry(&mut items, 7, 1).is_err());
        assert!(move_entry(&mut Vec::<char>::new(), 0, 0).is_err());
        assert_eq!(items, letters());
    }

    #[test]
    fn test_every_move_lands_at_target_and_keeps_others_in_order() {
        let original = letters();
        for from in 0..original.len() {
            for to in 0..original.len() {
                let mut items = original.clone();
                move_entry(&mut items, from, to).unwrap();

                assert_eq!(items.len(), original.len());
                assert_eq!(items[to], original[from], "move {from} -> {to}");

                let others: Vec<_> = items.iter().filter(|c| **c != original[from]).collect();
                let expected: Vec<_> = original.iter().filter(|c| **c != original[from]).collect();
                assert_eq!(others, expected, "move {from} -> {to}");
            }
        }
    }

    #[test]
    fn test_move_then_move_back_restores_order() {
        let original = letters();
        for from in 0..original.len() {
            for to in 0..original.len() {
                let mut items = original.clone();
                move_entry(&mut items, from, to).unwrap();
                move_entry(&mut items, to, from).unwrap();
                assert_eq!(items, original, "round trip {from} <-> {to}");
            }
        }
    }

    #[test]
    fn test_equal_values_do_not_shift_the_target() {
        let mut items = vec!['a', 'b', 'a', 'c'];
        move_entry(&mut items, 3, 2).unwrap();
        assert_eq!(items, vec!['a', 'b', 'c', 'a']);

        let mut items = vec!['a', 'b', 'a', 'c'];
        move_entry(&mut items, 0, 2).unwrap();
        assert_eq!(items, vec!['b', 'a', 'a', 'c']);

        let mut items = vec!['x', 'a', 'b', 'a'];
        move_entry(&mut items, 0, 3).unwrap();
        assert_eq!(items, vec!['a', 'b', 'a', 'x']);
    }
}
