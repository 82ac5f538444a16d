use alloc::string::String;
use core::fmt;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::iter::FusedIterator;

use crate::entry::Entry;
use crate::error::Error;
#[cfg(any(test, feature = "stats"))]
use crate::hash_table::DebugStats;
use crate::hash_table::DEFAULT_LOAD_FACTOR;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A phone directory keyed by name, stored in a separate-chaining
/// [`HashTable`].
///
/// Each node keeps the key, the stored [`Entry`] and the key's full hash
/// together, so chain walks compare cached hashes and keys without re-hashing,
/// and growth relinks nodes by their cached hash alone.
///
/// Values go in and come out by copy: [`get`](Self::get) and
/// [`lookup`](Self::lookup) return clones, and nothing hands out a way to
/// reach the table's nodes.
#[derive(Clone)]
pub struct Directory<S> {
    table: HashTable<(String, Entry)>,
    hash_builder: S,
}

impl<S> Debug for Directory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in self.table.iter() {
            map.entry(name, entry);
        }
        map.finish()
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl Directory<crate::DefaultHashBuilder> {
    /// Creates an empty directory with `capacity` buckets, the default load
    /// factor of `0.75` and the [`DefaultHashBuilder`](crate::DefaultHashBuilder).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    ///
    /// let directory = Directory::with_capacity(8).unwrap();
    /// assert!(directory.is_empty());
    /// assert_eq!(directory.capacity(), 8);
    /// assert_eq!(directory.threshold(), 6);
    ///
    /// assert!(Directory::with_capacity(0).is_err());
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }

    /// Creates an empty directory with `capacity` buckets that grows once its
    /// size reaches `floor(capacity * load_factor)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero and
    /// [`Error::InvalidLoadFactor`] if `load_factor` is not a positive finite
    /// number.
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Result<Self, Error> {
        Self::with_capacity_load_factor_and_hasher(capacity, load_factor, Default::default())
    }
}

impl<S> Directory<S>
where
    S: BuildHasher,
{
    /// Creates an empty directory with `capacity` buckets and the given hasher
    /// builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use chain_directory::Directory;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let directory = Directory::with_capacity_and_hasher(16, SimpleHasher).unwrap();
    /// assert_eq!(directory.capacity(), 16);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self, Error> {
        Self::with_capacity_load_factor_and_hasher(capacity, DEFAULT_LOAD_FACTOR, hash_builder)
    }

    /// Creates an empty directory with `capacity` buckets, the given load
    /// factor and hasher builder.
    pub fn with_capacity_load_factor_and_hasher(
        capacity: usize,
        load_factor: f32,
        hash_builder: S,
    ) -> Result<Self, Error> {
        Ok(Self {
            table: HashTable::with_capacity_and_load_factor(capacity, load_factor)?,
            hash_builder,
        })
    }

    #[inline]
    fn hash(&self, name: &str) -> u64 {
        self.hash_builder.hash_one(name)
    }

    /// Returns the number of entries in the directory.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the directory holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the size at which the next new entry grows the directory.
    pub fn threshold(&self) -> usize {
        self.table.threshold()
    }

    /// Returns the configured load factor.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Changes the load factor and recomputes the threshold immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLoadFactor`] if `load_factor` is not a positive
    /// finite number.
    pub fn set_load_factor(&mut self, load_factor: f32) -> Result<(), Error> {
        self.table.set_load_factor(load_factor)
    }

    /// Stores `entry` under its name.
    ///
    /// If the name is already present, the stored entry is replaced in place
    /// and the old one is returned; the size is unchanged and no growth check
    /// runs. Otherwise a new node becomes the head of its bucket's chain, and
    /// the directory doubles its bucket count if its size has reached the
    /// threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    /// use chain_directory::Entry;
    ///
    /// let mut directory = Directory::with_capacity(8).unwrap();
    /// assert_eq!(directory.insert(Entry::new("John Snow", "+485327095")), None);
    ///
    /// let old = directory.insert(Entry::new("John Snow", "+111"));
    /// assert_eq!(old, Some(Entry::new("John Snow", "+485327095")));
    /// assert_eq!(directory.len(), 1);
    /// ```
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        let hash = self.hash(entry.name());
        match self.table.entry(hash, |(name, _)| name == entry.name()) {
            TableEntry::Occupied(mut occupied) => {
                Some(core::mem::replace(&mut occupied.get_mut().1, entry))
            }
            TableEntry::Vacant(vacant) => {
                let name = String::from(entry.name());
                vacant.insert((name, entry));
                None
            }
        }
    }

    /// Returns a copy of the entry stored under `name`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    /// use chain_directory::Entry;
    ///
    /// let mut directory = Directory::with_capacity(8).unwrap();
    /// directory.insert(Entry::new("Mike Tayson", "+235236231"));
    ///
    /// assert_eq!(
    ///     directory.get("Mike Tayson").map(|e| e.phone_number().to_string()),
    ///     Some("+235236231".to_string())
    /// );
    /// assert_eq!(directory.get("Nobody"), None);
    /// ```
    pub fn get(&self, name: &str) -> Option<Entry> {
        self.find(name).cloned()
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        let hash = self.hash(name);
        self.table
            .find(hash, |(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Returns `true` if an entry is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Looks `name` up for presentation.
    ///
    /// The returned [`Lookup`] renders as the entry itself when found, and as
    /// `Key "<name>" not found` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    /// use chain_directory::Entry;
    ///
    /// let mut directory = Directory::with_capacity(8).unwrap();
    /// directory.insert(Entry::new("John Snow", "+485327095"));
    ///
    /// assert_eq!(
    ///     directory.lookup("John Snow").to_string(),
    ///     r#"{ name: "John Snow", phone_number: "+485327095" }"#
    /// );
    /// assert_eq!(
    ///     directory.lookup("Arya").to_string(),
    ///     r#"Key "Arya" not found"#
    /// );
    /// ```
    pub fn lookup<'a>(&self, name: &'a str) -> Lookup<'a> {
        Lookup {
            name,
            entry: self.get(name),
        }
    }

    /// Removes the entry stored under `name` and returns it.
    ///
    /// Removing a name that is not present does nothing and returns `None`.
    /// The bucket count never shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    /// use chain_directory::Entry;
    ///
    /// let mut directory = Directory::with_capacity(8).unwrap();
    /// directory.insert(Entry::new("gsdgsdgsd", "+235236231"));
    ///
    /// assert!(directory.remove("gsdgsdgsd").is_some());
    /// assert!(directory.remove("gsdgsdgsd").is_none());
    /// assert!(directory.is_empty());
    /// ```
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        let hash = self.hash(name);
        self.table
            .remove(hash, |(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Relinks every entry into `new_capacity` buckets.
    ///
    /// Inserting grows the directory on its own; this is for callers that want
    /// to size it up front or compact it after many removals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `new_capacity` is zero and
    /// [`Error::AllocationFailed`] if the bucket array cannot be reserved.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), Error> {
        self.table.grow(new_capacity)
    }

    /// Returns a restartable view over every stored entry.
    ///
    /// The [`Listing`] iterates entries bucket by bucket and renders them one
    /// per line. No ordering is promised, and the order changes as the
    /// directory grows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_directory::Directory;
    /// use chain_directory::Entry;
    ///
    /// let mut directory = Directory::with_capacity(8).unwrap();
    /// directory.insert(Entry::new("a", "1"));
    /// directory.insert(Entry::new("b", "2"));
    ///
    /// let listing = directory.display();
    /// assert_eq!(listing.into_iter().count(), 2);
    /// assert_eq!(listing.to_string().lines().count(), 2);
    /// ```
    pub fn display(&self) -> Listing<'_> {
        Listing { table: &self.table }
    }

    /// Returns an iterator over the stored entries.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Removes every entry and yields them by value.
    ///
    /// The directory is empty afterwards even if the iterator is dropped early.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Removes every entry, keeping the bucket count.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Computes a histogram of chain lengths.
    ///
    /// Requires the `stats` feature. See [`HashTable::chain_histogram`].
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.chain_histogram()
    }

    /// Returns utilization statistics for the underlying table.
    ///
    /// Requires the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.table.debug_stats()
    }

    /// Pretty-prints the chain-length histogram to stdout.
    ///
    /// Requires the `stats` and `std` features.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_chain_histogram(&self) {
        self.table.print_chain_histogram();
    }
}

impl<S> Extend<Entry> for Directory<S>
where
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl<'a, S> IntoIterator for &'a Directory<S>
where
    S: BuildHasher,
{
    type IntoIter = Iter<'a>;
    type Item = &'a Entry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The result of [`Directory::lookup`].
///
/// Renders as the found entry, or as `Key "<name>" not found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<'a> {
    name: &'a str,
    entry: Option<Entry>,
}

impl Lookup<'_> {
    /// The name that was looked up.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The copy of the entry that was found, if any.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Consumes the lookup, returning the found entry.
    pub fn into_entry(self) -> Option<Entry> {
        self.entry
    }

    /// Prints the rendered lookup on its own line to stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("{self}");
    }
}

impl fmt::Display for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some(entry) => fmt::Display::fmt(entry, f),
            None => write!(f, "Key \"{}\" not found", self.name),
        }
    }
}

/// A read-only, restartable view over every entry of a [`Directory`].
///
/// Created by [`Directory::display`]. It is `Copy`; every call to
/// [`iter`](Self::iter) or [`into_iter`](IntoIterator::into_iter) starts from
/// the first bucket again. Its [`Display`](fmt::Display) form is one rendered
/// entry per line.
pub struct Listing<'a> {
    table: &'a HashTable<(String, Entry)>,
}

impl Clone for Listing<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for Listing<'_> {}

impl<'a> Listing<'a> {
    /// Returns an iterator over the listed entries.
    pub fn iter(&self) -> Iter<'a> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns the number of listed entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if there is nothing to list.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Prints every entry, one per line, to stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        print!("{self}");
    }
}

impl<'a> IntoIterator for Listing<'a> {
    type IntoIter = Iter<'a>;
    type Item = &'a Entry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.iter() {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// An iterator over the entries of a [`Directory`].
pub struct Iter<'a> {
    inner: crate::hash_table::Iter<'a, (String, Entry)>,
}

impl Clone for Iter<'_> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, entry)| entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

/// A draining iterator over the entries of a [`Directory`].
pub struct Drain<'a> {
    inner: crate::hash_table::Drain<'a, (String, Entry)>,
}

impl Iterator for Drain<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, entry)| entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
