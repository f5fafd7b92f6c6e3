//! Name Table (string atomization)
//!
//! Element names, attribute names, prefixes and namespace URIs go through a
//! `NameTable` so that equal names share one allocation. The reader then
//! compares names by pointer instead of by content.
//!
//! Layout: open hashing with a polynomial rolling hash, a power-of-two
//! bucket array starting at 32 buckets, doubled when the entry count
//! reaches the mask (load factor 1.0).

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

const INITIAL_BUCKETS: usize = 32;
const HASH_SEED: u32 = 0x2D35_8DCF;

/// An interned, immutable string
#[derive(Clone)]
pub struct Atom(Rc<str>);

impl Atom {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity comparison; equal for atoms from the same table iff content is equal
    #[inline]
    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared allocation, usable as an identity key
    #[inline]
    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl Deref for Atom {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Atom {
    #[inline]
    fn eq(&self, other: &Atom) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for Atom {}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry {
    hash: u32,
    atom: Atom,
}

struct Table {
    buckets: Vec<Vec<Entry>>,
    count: usize,
    mask: usize,
    empty: Atom,
}

impl Table {
    fn new() -> Self {
        Table {
            buckets: (0..INITIAL_BUCKETS).map(|_| Vec::new()).collect(),
            count: 0,
            mask: INITIAL_BUCKETS - 1,
            empty: Atom(Rc::from("")),
        }
    }

    fn find(&self, hash: u32, key: &[u8]) -> Option<&Atom> {
        self.buckets[hash as usize & self.mask]
            .iter()
            .find(|e| e.hash == hash && e.atom.as_bytes() == key)
            .map(|e| &e.atom)
    }

    fn insert(&mut self, hash: u32, atom: Atom) {
        self.buckets[hash as usize & self.mask].push(Entry { hash, atom });
        self.count += 1;
        if self.count == self.mask {
            self.grow();
        }
    }

    fn grow(&mut self) {
        let new_len = (self.mask + 1) * 2;
        let mut buckets: Vec<Vec<Entry>> = (0..new_len).map(|_| Vec::new()).collect();
        let new_mask = new_len - 1;
        for entry in self.buckets.drain(..).flatten() {
            buckets[entry.hash as usize & new_mask].push(entry);
        }
        self.buckets = buckets;
        self.mask = new_mask;
    }
}

/// Rolling hash over the UTF-8 bytes of a name
#[inline]
fn compute_hash(key: &[u8]) -> u32 {
    let mut hash = (key.len() as u32).wrapping_add(HASH_SEED);
    for &b in key {
        hash = hash.wrapping_add((hash << 7) ^ b as u32);
    }
    hash = hash.wrapping_sub(hash >> 17);
    hash = hash.wrapping_sub(hash >> 11);
    hash.wrapping_sub(hash >> 5)
}

/// Shared string atomization table
///
/// Cloning the handle shares the table; a table can back several readers
/// on one thread.
#[derive(Clone)]
pub struct NameTable {
    inner: Rc<RefCell<Table>>,
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameTable").field("count", &self.len()).finish()
    }
}

impl NameTable {
    pub fn new() -> Self {
        NameTable {
            inner: Rc::new(RefCell::new(Table::new())),
        }
    }

    /// Intern a string, returning the canonical atom
    pub fn add(&self, key: &str) -> Atom {
        self.add_bytes(key.as_bytes())
    }

    /// Intern a range of a character array
    pub fn add_chars(&self, chars: &[char], offset: usize, len: usize) -> Atom {
        let key: String = chars.iter().skip(offset).take(len).collect();
        self.add(&key)
    }

    /// Intern UTF-8 bytes taken from the reader buffer
    ///
    /// Invalid sequences are replaced with U+FFFD; the reader only passes
    /// slices that begin and end on character boundaries.
    pub fn add_bytes(&self, key: &[u8]) -> Atom {
        let mut table = self.inner.borrow_mut();
        if key.is_empty() {
            return table.empty.clone();
        }
        let hash = compute_hash(key);
        if let Some(atom) = table.find(hash, key) {
            return atom.clone();
        }
        let text = String::from_utf8_lossy(key);
        let atom = Atom(Rc::from(&*text));
        if text.len() != key.len() {
            // Lossy replacement changed the bytes; index by the stored text
            let rehash = compute_hash(atom.as_bytes());
            if let Some(existing) = table.find(rehash, atom.as_bytes()) {
                return existing.clone();
            }
            table.insert(rehash, atom.clone());
        } else {
            table.insert(hash, atom.clone());
        }
        atom
    }

    /// Look up a string without inserting it
    pub fn get(&self, key: &str) -> Option<Atom> {
        let table = self.inner.borrow();
        if key.is_empty() {
            return Some(table.empty.clone());
        }
        table.find(compute_hash(key.as_bytes()), key.as_bytes()).cloned()
    }

    /// The shared empty atom
    pub fn empty(&self) -> Atom {
        self.inner.borrow().empty.clone()
    }

    /// Number of interned strings, excluding the empty atom
    pub fn len(&self) -> usize {
        self.inner.borrow().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
