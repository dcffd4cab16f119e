use std::collections::HashMap;

use crate::bits::Bits;

/// Canonicalizes component masks to small integer ids.
///
/// Ids are dense and start at 1; 0 means "no composition". The world
/// registers the empty mask first, so an entity without components has
/// composition 1.
#[derive(Debug)]
pub struct CompositionRegistry {
    ids: HashMap<Bits, u32>,
    bits: Vec<Bits>,
}

impl Default for CompositionRegistry {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            // Slot 0 is the reserved "no composition" id.
            bits: vec![Bits::new()],
        }
    }
}

impl CompositionRegistry {
    /// Id already assigned to `bits`, if any.
    pub fn id_of(&self, bits: &Bits) -> Option<u32> {
        self.ids.get(bits).copied()
    }

    /// The mask behind `id`.
    pub fn bits_of(&self, id: u32) -> Option<&Bits> {
        if id == 0 {
            return None;
        }
        self.bits.get(id as usize)
    }

    /// Number of registered compositions.
    pub fn len(&self) -> usize {
        self.bits.len() - 1
    }

    /// Returns true if nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(id, bits)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Bits)> {
        self.bits
            .iter()
            .enumerate()
            .skip(1)
            .map(|(id, bits)| (id as u32, bits))
    }

    /// Id for `bits`, assigning the next one if unseen. The flag is true
    /// when the id was just assigned.
    pub(crate) fn get_or_register(&mut self, bits: &Bits) -> (u32, bool) {
        if let Some(&id) = self.ids.get(bits) {
            return (id, false);
        }
        let id = self.bits.len() as u32;
        self.bits.push(bits.clone());
        self.ids.insert(bits.clone(), id);
        (id, true)
    }
}
