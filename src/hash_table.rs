//! A separate-chaining hash table with caller-supplied hashes.
//!
//! `HashTable<V>` owns an array of bucket heads and an arena of chain nodes.
//! Every node caches the full hash of its value, so chain walks compare hashes
//! before calling the equality predicate and growth never re-hashes.
//!
//! Nodes are addressed by their arena index. Removing a node returns its slot
//! to a free list that later inserts draw from, and growing the bucket array
//! relinks nodes into their new buckets without moving or copying them.

use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;

use log::debug;
use log::info;
use log::trace;

use crate::error::Error;

/// Load factor used when none is given.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Chains of this length or longer share the last histogram bin.
#[cfg(any(test, feature = "stats"))]
pub const MAX_TRACKED_CHAIN: usize = 16;

/// Arena index of a chain node, or `None` at the end of a chain.
type Link = Option<usize>;

#[inline(always)]
fn bucket_for(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

#[inline(always)]
fn target_threshold(capacity: usize, load_factor: f32) -> usize {
    // Truncates toward zero, which is floor for the positive values we accept.
    (capacity as f64 * f64::from(load_factor)) as usize
}

fn validate_load_factor(load_factor: f32) -> Result<f32, Error> {
    if load_factor.is_finite() && load_factor > 0.0 {
        Ok(load_factor)
    } else {
        Err(Error::InvalidLoadFactor(load_factor))
    }
}

fn alloc_buckets(capacity: usize) -> Result<Vec<Link>, Error> {
    if capacity == 0 {
        return Err(Error::ZeroCapacity);
    }

    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| Error::AllocationFailed { slots: capacity })?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

#[derive(Clone)]
struct Node<V> {
    hash: u64,
    value: V,
    next: Link,
}

#[derive(Clone)]
enum Slot<V> {
    Occupied(Node<V>),
    Free { next_free: Link },
}

/// Where a matching node sits: its bucket, its chain predecessor (if any) and
/// its own arena index.
#[derive(Clone, Copy)]
struct Located {
    bucket: usize,
    prev: Link,
    index: usize,
}

/// Debug statistics for hash table analysis.
///
/// Requires the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Population at which the next insert grows the table
    pub threshold: usize,
    /// Number of buckets heading a non-empty chain
    pub occupied_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Bucket utilization (occupied_buckets / capacity)
    pub bucket_utilization: f64,
    /// Arena slots waiting on the free list
    pub free_slots: usize,
    /// Total bytes reserved for buckets and nodes
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} buckets ({:.2}% load factor, grows at {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.threshold
        );
        println!(
            "Bucket Usage: {}/{} ({:.2}% utilization)",
            self.occupied_buckets,
            self.capacity,
            self.bucket_utilization * 100.0
        );
        println!("Longest Chain: {}", self.longest_chain);
        println!("Free Slots: {}", self.free_slots);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A hash table using separate chaining and load-factor driven growth.
///
/// `HashTable<V>` stores values of type `V`. Like a raw table, it requires you
/// to provide both the hash value and an equality predicate for each
/// operation; [`Directory`](crate::Directory) wraps it with a hasher and a
/// string key.
///
/// ## Growth
///
/// After an insert adds a new node, the table doubles its bucket count once
/// `len() >= threshold()`, where `threshold = floor(capacity * load_factor)`.
/// Growing relinks every node into the new bucket array; values are never
/// moved or re-hashed. Removal never shrinks the table.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use chain_directory::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(8).unwrap();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     chain_directory::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     chain_directory::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    buckets: Vec<Link>,
    slots: Vec<Slot<V>>,
    free_head: Link,

    populated: usize,
    threshold: usize,
    load_factor: f32,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let chains = self
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, head)| head.is_some())
            .map(|(bucket, head)| (bucket, self.chain(*head).collect::<Vec<_>>()))
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("chains", &chains)
            .field("populated", &self.populated)
            .field("capacity", &self.buckets.len())
            .field("threshold", &self.threshold)
            .field("free_slots", &self.free_slots())
            .finish()
    }
}

impl<V> HashTable<V> {
    /// Creates a new hash table with `capacity` buckets and the default load
    /// factor of `0.75`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero, and
    /// [`Error::AllocationFailed`] if the bucket array cannot be reserved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_directory::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(8).unwrap();
    /// assert_eq!(table.capacity(), 8);
    /// assert_eq!(table.threshold(), 6);
    ///
    /// assert!(HashTable::<String>::with_capacity(0).is_err());
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR)
    }

    /// Creates a new hash table with `capacity` buckets that grows once its
    /// population reaches `floor(capacity * load_factor)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is zero,
    /// [`Error::InvalidLoadFactor`] if `load_factor` is not a positive finite
    /// number, and [`Error::AllocationFailed`] if the bucket array cannot be
    /// reserved.
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Result<Self, Error> {
        let load_factor = validate_load_factor(load_factor)?;
        let buckets = alloc_buckets(capacity)?;

        Ok(Self {
            buckets,
            slots: Vec::new(),
            free_head: None,
            populated: 0,
            threshold: target_threshold(capacity, load_factor),
            load_factor,
        })
    }

    #[inline(always)]
    fn bucket_index(&self, hash: u64) -> usize {
        bucket_for(hash, self.buckets.len())
    }

    #[inline]
    fn node(&self, index: usize) -> &Node<V> {
        match &self.slots[index] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => unreachable!("chain links to free slot {index}"),
        }
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node<V> {
        match &mut self.slots[index] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => unreachable!("chain links to free slot {index}"),
        }
    }

    fn chain(&self, head: Link) -> ChainIndices<'_, V> {
        ChainIndices {
            table: self,
            cursor: head,
        }
    }

    fn free_slots(&self) -> usize {
        self.slots.len() - self.populated
    }

    /// Walk the chain `hash` addresses and return the position of the first
    /// node whose cached hash equals `hash` and whose value satisfies `eq`.
    fn locate(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<Located> {
        let bucket = self.bucket_index(hash);
        let mut prev = None;
        let mut cursor = self.buckets[bucket];

        while let Some(index) = cursor {
            let node = self.node(index);
            if node.hash == hash && eq(&node.value) {
                return Some(Located {
                    bucket,
                    prev,
                    index,
                });
            }
            prev = cursor;
            cursor = node.next;
        }

        None
    }

    /// Place `node` in the arena, reusing a freed slot when one is available.
    fn alloc_node(&mut self, node: Node<V>) -> usize {
        let Some(index) = self.free_head else {
            self.slots.push(Slot::Occupied(node));
            return self.slots.len() - 1;
        };

        let Slot::Free { next_free } = &self.slots[index] else {
            unreachable!("free list links to occupied slot {index}");
        };
        self.free_head = *next_free;
        self.slots[index] = Slot::Occupied(node);
        trace!("reusing free slot {index}");
        index
    }

    /// Return the slot at `index` to the free list and hand back its value.
    ///
    /// The node must already be unreachable from every chain.
    fn release_node(&mut self, index: usize) -> V {
        let slot = core::mem::replace(
            &mut self.slots[index],
            Slot::Free {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(index);

        match slot {
            Slot::Occupied(node) => node.value,
            Slot::Free { .. } => unreachable!("released slot {index} twice"),
        }
    }

    /// Splice the located node out of its chain, then release it.
    ///
    /// The splice happens first so the successor stays linked to the rest of
    /// the chain; only the removed node's slot is freed.
    fn unlink(&mut self, at: Located) -> V {
        let next = self.node(at.index).next;
        match at.prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.buckets[at.bucket] = next,
        }

        self.populated -= 1;
        self.release_node(at.index)
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values are yielded bucket by bucket, and within a bucket from the most
    /// recently inserted node to the oldest. No ordering is promised beyond
    /// that, and the order changes when the table grows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_directory::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10).unwrap();
    /// table
    ///     .entry(hash_str("key1"), |s: &String| s == "key1")
    ///     .or_insert("key1".to_string());
    /// table
    ///     .entry(hash_str("key2"), |s: &String| s == "key2")
    ///     .or_insert("key2".to_string());
    ///
    /// let mut values: Vec<&String> = table.iter().collect();
    /// values.sort();
    /// assert_eq!(values, ["key1", "key2"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            bucket_index: 0,
            cursor: None,
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// After calling `drain()`, the table will be empty, even if the iterator
    /// is dropped before it is exhausted. The bucket count is kept.
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            bucket_index: 0,
        }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the population at which the next new insert grows the table.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the configured load factor.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Changes the load factor and recomputes the threshold immediately.
    ///
    /// This never resizes by itself; a lowered threshold takes effect on the
    /// next insert of a new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLoadFactor`] if `load_factor` is not a positive
    /// finite number. The table is left unchanged in that case.
    pub fn set_load_factor(&mut self, load_factor: f32) -> Result<(), Error> {
        self.load_factor = validate_load_factor(load_factor)?;
        self.threshold = target_threshold(self.buckets.len(), self.load_factor);
        debug!(
            "load factor set to {}, threshold now {}",
            self.load_factor, self.threshold
        );
        Ok(())
    }

    /// Removes all elements from the table.
    ///
    /// The bucket count is preserved; node storage is released.
    pub fn clear(&mut self) {
        self.buckets.fill(None);
        self.slots.clear();
        self.free_head = None;
        self.populated = 0;
    }

    /// Removes and returns a value from the table.
    ///
    /// The value is identified by its hash and an equality predicate. Only the
    /// matching node is released; the rest of its chain is relinked around it.
    /// Returns `None` and leaves the table untouched if nothing matches.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_directory::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8).unwrap();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        match self.locate(hash, eq) {
            Some(at) => Some(self.unlink(at)),
            None => {
                trace!("remove: no value for hash {hash:#018x}");
                None
            }
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_directory::hash_table::Entry;
    /// # use chain_directory::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10).unwrap();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s.starts_with("hello")) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// let value = table
    ///     .entry(hash, |s: &String| s.starts_with("hello"))
    ///     .or_insert("other".to_string());
    /// assert_eq!(value, "hello");
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.locate(hash, eq) {
            Some(at) => Entry::Occupied(OccupiedEntry { table: self, at }),
            None => {
                let bucket = self.bucket_index(hash);
                Entry::Vacant(VacantEntry {
                    table: self,
                    bucket,
                    hash,
                })
            }
        }
    }

    /// Finds a value by its hash and an equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_directory::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8).unwrap();
    /// table.entry(7, |&n: &u64| n == 7).or_insert(7);
    ///
    /// assert_eq!(table.find(7, |&n| n == 7), Some(&7));
    /// assert_eq!(table.find(8, |&n| n == 8), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let at = self.locate(hash, eq)?;
        Some(&self.node(at.index).value)
    }

    /// Finds a value by its hash and an equality predicate, returning a
    /// mutable reference.
    ///
    /// Changing the part of the value that `eq` and the hash are derived from
    /// leaves the value in the wrong chain; don't do that.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let at = self.locate(hash, eq)?;
        Some(&mut self.node_mut(at.index).value)
    }

    /// Moves every node into a new array of `new_capacity` buckets.
    ///
    /// Each old chain is walked to its end before the next one is started.
    /// Nodes are pushed onto the head of their new bucket using their cached
    /// hash; none are copied, dropped or re-hashed. The threshold is
    /// recomputed for the new capacity and the population is unchanged.
    ///
    /// Inserts call this automatically with twice the current capacity. An
    /// explicit call may also pick a smaller capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `new_capacity` is zero and
    /// [`Error::AllocationFailed`] if the new bucket array cannot be reserved.
    /// The table is left unchanged in both cases.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_directory::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(4).unwrap();
    /// for n in 0..3u64 {
    ///     table.entry(n, |&v: &u64| v == n).or_insert(n);
    /// }
    ///
    /// table.grow(32).unwrap();
    /// assert_eq!(table.capacity(), 32);
    /// assert_eq!(table.threshold(), 24);
    /// assert_eq!(table.len(), 3);
    /// ```
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), Error> {
        let mut new_buckets = alloc_buckets(new_capacity)?;
        info!("grow to {new_capacity}");

        let old_buckets = core::mem::take(&mut self.buckets);
        for head in old_buckets {
            let mut cursor = head;
            while let Some(index) = cursor {
                let node = self.node_mut(index);
                // Read the old successor before `next` is pointed into the
                // new array, or the rest of this chain is lost.
                let old_next = node.next;
                let target = bucket_for(node.hash, new_capacity);
                node.next = new_buckets[target];
                new_buckets[target] = Some(index);
                cursor = old_next;
            }
        }

        self.buckets = new_buckets;
        self.threshold = target_threshold(new_capacity, self.load_factor);
        Ok(())
    }

    #[cold]
    #[inline(never)]
    fn grow_after_insert(&mut self) {
        let new_capacity = self.buckets.len().saturating_mul(2);
        if let Err(Error::AllocationFailed { slots }) = self.grow(new_capacity) {
            handle_alloc_error(Layout::array::<Link>(slots).expect("allocation size overflow"));
        }
    }

    /// Computes a histogram of chain lengths for the current table state.
    ///
    /// Requires the `stats` feature.
    ///
    /// Returns a vector of length `MAX_TRACKED_CHAIN + 1` where index `n`
    /// counts buckets whose chain holds exactly `n` nodes (index 0 counts
    /// empty buckets), and the last index counts every chain of
    /// `MAX_TRACKED_CHAIN` nodes or more.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; MAX_TRACKED_CHAIN + 1];
        for &head in &self.buckets {
            let length = self.chain(head).count();
            hist[length.min(MAX_TRACKED_CHAIN)] += 1;
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Requires the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.buckets.len();
        let mut occupied_buckets = 0;
        let mut longest_chain = 0;
        for &head in &self.buckets {
            let length = self.chain(head).count();
            if length > 0 {
                occupied_buckets += 1;
            }
            longest_chain = longest_chain.max(length);
        }

        DebugStats {
            populated: self.populated,
            capacity,
            threshold: self.threshold,
            occupied_buckets,
            longest_chain,
            load_factor: self.populated as f64 / capacity as f64,
            bucket_utilization: occupied_buckets as f64 / capacity as f64,
            free_slots: self.free_slots(),
            total_bytes: self.buckets.capacity() * core::mem::size_of::<Link>()
                + self.slots.capacity() * core::mem::size_of::<Slot<V>>(),
        }
    }

    /// Pretty-prints the chain-length histogram horizontally using stdout.
    ///
    /// Requires the `stats` and `std` features. Each row is a chain length;
    /// the last row, labelled `>=`, collects the long tail.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_chain_histogram(&self) {
        let hist = self.chain_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!(
            "chain histogram ({} entries, {} buckets):",
            self.populated,
            self.buckets.len()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            let width = (count * max_bar).div_ceil(max);
            "█".repeat(width)
        };

        for (length, &count) in hist.iter().take(MAX_TRACKED_CHAIN).enumerate() {
            println!("{:>2} | {} ({})", length, make_bar(count), count);
        }

        let tail = hist[MAX_TRACKED_CHAIN];
        println!(">= | {} ({})", make_bar(tail), tail);
    }
}

/// Node indices along one chain, head first.
struct ChainIndices<'a, V> {
    table: &'a HashTable<V>,
    cursor: Link,
}

impl<V> Iterator for ChainIndices<'_, V> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        self.cursor = self.table.node(index).next;
        Some(index)
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no value in the chain matched
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable reference
    /// to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// [`entry`]: HashTable::entry
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    bucket: usize,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value as the new head of its bucket's chain and returns a
    /// mutable reference to it.
    ///
    /// If the population reaches the threshold, the table grows to twice its
    /// bucket count before this returns. The inserted value is not moved by
    /// that growth.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the grown bucket array cannot
    /// be allocated.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let index = table.alloc_node(Node {
            hash: self.hash,
            value,
            next: table.buckets[self.bucket],
        });
        table.buckets[self.bucket] = Some(index);
        table.populated += 1;

        if table.populated >= table.threshold {
            table.grow_after_insert();
        }

        &mut table.node_mut(index).value
    }
}

/// A view into an occupied entry in the hash table.
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    at: Located,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.table.node(self.at.index).value
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.table.node_mut(self.at.index).value
    }

    /// Converts the entry into a mutable reference to the value, bound to the
    /// table's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        &mut table.node_mut(self.at.index).value
    }

    /// Replaces the value in the entry and returns the old one. The node,
    /// its cached hash and its chain position are unchanged.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the table and returns its value.
    pub fn remove(self) -> V {
        self.table.unlink(self.at)
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`]. Cloning it
/// restarts nothing; it copies the current position.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    table: &'a HashTable<V>,
    bucket_index: usize,
    cursor: Link,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            bucket_index: self.bucket_index,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(index) = self.cursor {
                let node = self.table.node(index);
                self.cursor = node.next;
                self.remaining -= 1;
                return Some(&node.value);
            }

            self.cursor = *self.table.buckets.get(self.bucket_index)?;
            self.bucket_index += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// It yields owned `V` values and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    bucket_index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}

        // Every slot is on the free list now.
        self.table.slots.clear();
        self.table.free_head = None;
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.bucket_index < self.table.buckets.len() {
            if let Some(index) = self.table.buckets[self.bucket_index] {
                let next = self.table.node(index).next;
                self.table.buckets[self.bucket_index] = next;
                self.table.populated -= 1;
                return Some(self.table.release_node(index));
            }

            self.bucket_index += 1;
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item(table: &mut HashTable<Item>, hash: u64, key: u64, value: i32) {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied for {key}: {:#?}", table),
        }
    }

    /// Walks every chain and checks the structural invariants: each node sits
    /// in the bucket its cached hash addresses, no node is reachable twice,
    /// the reachable count is the population and no live slot is orphaned.
    fn assert_invariants<V>(table: &HashTable<V>) {
        let mut seen = vec![false; table.slots.len()];
        let mut reachable = 0;
        for (bucket, &head) in table.buckets.iter().enumerate() {
            for index in table.chain(head) {
                assert!(!seen[index], "slot {index} linked twice: {:#?}", table);
                seen[index] = true;
                reachable += 1;
                assert_eq!(
                    bucket_for(table.node(index).hash, table.capacity()),
                    bucket,
                    "slot {index} in wrong bucket: {:#?}",
                    table
                );
            }
        }
        assert_eq!(reachable, table.len(), "{:#?}", table);

        let occupied = table
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        assert_eq!(occupied, table.len(), "orphaned nodes: {:#?}", table);
        assert_eq!(
            table.threshold(),
            target_threshold(table.capacity(), table.load_factor())
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            HashTable::<Item>::with_capacity(0).err(),
            Some(Error::ZeroCapacity)
        );
    }

    #[test]
    fn invalid_load_factor_rejected() {
        for lf in [0.0f32, -0.5, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                HashTable::<Item>::with_capacity_and_load_factor(8, lf),
                Err(Error::InvalidLoadFactor(_))
            ));
        }
    }

    #[test]
    fn threshold_is_floor_of_capacity_times_load_factor() {
        let table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        assert_eq!(table.threshold(), 6);

        let table: HashTable<Item> = HashTable::with_capacity_and_load_factor(10, 0.75).unwrap();
        assert_eq!(table.threshold(), 7);

        let table: HashTable<Item> = HashTable::with_capacity_and_load_factor(1, 0.5).unwrap();
        assert_eq!(table.threshold(), 0);

        let table: HashTable<Item> = HashTable::with_capacity_and_load_factor(4, 2.0).unwrap();
        assert_eq!(table.threshold(), 8);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(1).unwrap();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }
        assert_eq!(table.len(), 32);
        assert_invariants(&table);

        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        let k = 42u64;
        let hash = hash_key(&state, k);

        insert_item(&mut table, hash, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev = occ.insert(Item { key: k, value: 11 });
                assert_eq!(prev.value, 7);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        let found = table.find(hash, |v| v.key == k).unwrap();
        assert_eq!(found.value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn update_does_not_trigger_growth() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..5u64 {
            insert_item(&mut table, k, k, 0);
        }
        for round in 1..20 {
            for k in 0..5u64 {
                table
                    .entry(k, |v| v.key == k)
                    .and_modify(|v| v.value = round)
                    .or_insert(Item { key: k, value: -1 });
            }
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.capacity(), 8);
        for k in 0..5u64 {
            assert_eq!(table.find(k, |v| v.key == k).unwrap().value, 19);
        }
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k, 1);
        }

        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            if let Some(v) = table.find_mut(hash, |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            let v = table.find(hash, |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..8u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        assert_eq!(table.len(), 8);
        let capacity = table.capacity();

        for k in [0u64, 3, 7] {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k).expect("should remove");
            assert_eq!(removed.key, k);
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.capacity(), capacity, "removal never shrinks");
        assert_invariants(&table);

        let hash = hash_key(&state, 1000);
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn remove_from_chain_keeps_siblings() {
        // Three nodes in one bucket: chain order is newest first, 2 -> 1 -> 0.
        for victim in 0..3u64 {
            let mut table: HashTable<Item> = HashTable::with_capacity(64).unwrap();
            for k in 0..3u64 {
                insert_item(&mut table, 5, k, k as i32);
            }
            assert_eq!(table.chain(table.buckets[5]).count(), 3);

            let removed = table.remove(5, |v| v.key == victim).unwrap();
            assert_eq!(removed.key, victim);
            assert_eq!(table.len(), 2);
            assert!(table.find(5, |v| v.key == victim).is_none());
            for k in (0..3u64).filter(|&k| k != victim) {
                assert_eq!(
                    table.find(5, |v| v.key == k),
                    Some(&Item {
                        key: k,
                        value: k as i32
                    }),
                    "lost sibling {k} after removing {victim}: {:#?}",
                    table
                );
            }
            assert_invariants(&table);
        }
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut table: HashTable<Item> = HashTable::with_capacity(64).unwrap();
        for k in 0..4u64 {
            insert_item(&mut table, k, k, 0);
        }
        table.remove(1, |v| v.key == 1).unwrap();
        table.remove(2, |v| v.key == 2).unwrap();
        assert_eq!(table.free_slots(), 2);

        insert_item(&mut table, 10, 10, 0);
        insert_item(&mut table, 11, 11, 0);
        assert_eq!(table.free_slots(), 0);
        assert_eq!(table.slots.len(), 4);

        insert_item(&mut table, 12, 12, 0);
        assert_eq!(table.slots.len(), 5);
        assert_invariants(&table);
    }

    #[test]
    fn scenario_grows_on_sixth_insert() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..5u64 {
            insert_item(&mut table, k * 7, k, k as i32);
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.len(), 5);

        insert_item(&mut table, 35, 5, 5);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.threshold(), 12);
        assert_eq!(table.len(), 6);
        for k in 0..6u64 {
            assert!(table.find(k * 7, |v| v.key == k).is_some());
        }

        table.remove(14, |v| v.key == 2).unwrap();
        assert_eq!(table.len(), 5);
        assert!(table.find(14, |v| v.key == 2).is_none());
        for k in [0u64, 1, 3, 4, 5] {
            assert!(table.find(k * 7, |v| v.key == k).is_some());
        }
        assert_invariants(&table);
    }

    #[test]
    fn grow_relocates_whole_chain() {
        // Hashes 3, 11 and 19 share bucket 3 of 8. After growing to 16 they
        // split into buckets 3 and 11, so the relink has to keep walking the
        // old chain after moving each node.
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for (k, hash) in [(0u64, 3u64), (1, 11), (2, 19)] {
            insert_item(&mut table, hash, k, k as i32);
        }
        assert_eq!(table.chain(table.buckets[3]).count(), 3);

        table.grow(16).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.chain(table.buckets[3]).count(), 2);
        assert_eq!(table.chain(table.buckets[11]).count(), 1);
        for (k, hash) in [(0u64, 3u64), (1, 11), (2, 19)] {
            assert!(table.find(hash, |v| v.key == k).is_some(), "{:#?}", table);
        }
        assert_invariants(&table);
    }

    #[test]
    fn grow_relocates_chain_into_one_bucket() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..4u64 {
            insert_item(&mut table, 1, k, k as i32);
        }

        table.grow(32).unwrap();
        assert_eq!(table.chain(table.buckets[1]).count(), 4, "{:#?}", table);
        for k in 0..4u64 {
            assert_eq!(table.find(1, |v| v.key == k).unwrap().value, k as i32);
        }
        assert_invariants(&table);
    }

    #[test]
    fn grow_does_not_move_nodes() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..5u64 {
            insert_item(&mut table, k, k, 0);
        }
        let before: Vec<(u64, usize)> = (0..5u64)
            .map(|k| (k, table.locate(k, |v| v.key == k).unwrap().index))
            .collect();
        let arena = table.slots.len();

        table.grow(64).unwrap();
        assert_eq!(table.slots.len(), arena);
        for (k, index) in before {
            assert_eq!(table.locate(k, |v| v.key == k).unwrap().index, index);
        }
    }

    #[test]
    fn grow_to_smaller_capacity() {
        let mut table: HashTable<Item> = HashTable::with_capacity(64).unwrap();
        for k in 0..10u64 {
            insert_item(&mut table, k * 13, k, k as i32);
        }

        table.grow(3).unwrap();
        assert_eq!(table.capacity(), 3);
        assert_eq!(table.threshold(), 2);
        assert_eq!(table.len(), 10);
        for k in 0..10u64 {
            assert!(table.find(k * 13, |v| v.key == k).is_some());
        }
        assert_invariants(&table);
    }

    #[test]
    fn grow_to_zero_is_rejected() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        insert_item(&mut table, 1, 1, 1);
        assert_eq!(table.grow(0), Err(Error::ZeroCapacity));
        assert_eq!(table.capacity(), 8);
        assert!(table.find(1, |v| v.key == 1).is_some());
    }

    #[test]
    fn growth_crosses_threshold_repeatedly() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(2).unwrap();
        let mut capacities = vec![table.capacity()];
        for k in 0..200u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
            if *capacities.last().unwrap() != table.capacity() {
                capacities.push(table.capacity());
                for seen in 0..=k {
                    let hash = hash_key(&state, seen);
                    assert_eq!(
                        table.find(hash, |v| v.key == seen).map(|v| v.value),
                        Some(seen as i32)
                    );
                }
            }
        }
        assert_eq!(capacities, [2, 4, 8, 16, 32, 64, 128, 256, 512]);
        assert_eq!(table.len(), 200);
        assert_invariants(&table);
    }

    #[test]
    fn set_load_factor_recomputes_threshold() {
        let mut table: HashTable<Item> = HashTable::with_capacity(16).unwrap();
        table.set_load_factor(0.5).unwrap();
        assert_eq!(table.threshold(), 8);
        assert_eq!(table.capacity(), 16);

        assert_eq!(table.set_load_factor(-1.0), Err(Error::InvalidLoadFactor(-1.0)));
        assert_eq!(table.load_factor(), 0.5);
        assert_eq!(table.threshold(), 8);

        for k in 0..7u64 {
            insert_item(&mut table, k, k, 0);
        }
        assert_eq!(table.capacity(), 16);
        insert_item(&mut table, 7, 7, 0);
        assert_eq!(table.capacity(), 32);
        assert_eq!(table.threshold(), 16);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(1).unwrap();
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 100000);
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                })
            );
        }
        assert_invariants(&table);
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        let hash = 0;
        for k in 0..65u64 {
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 65);
        assert_eq!(table.debug_stats().longest_chain, 65);
        for k in 0..65u64 {
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                }),
                "{:#?}",
                table
            );
        }
        assert_invariants(&table);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn long_chain_teardown() {
        let mut table: HashTable<Item> = HashTable::with_capacity(1).unwrap();
        for k in 0..4096u64 {
            insert_item(&mut table, 0, k, 0);
        }
        assert_eq!(table.debug_stats().longest_chain, 4096);
        drop(table);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k, (k as i32) + 1);
        }
        let collected: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(collected.len(), 10, "{:#?}", table);
        assert_eq!(table.iter().len(), 10);
        for k in 10..20u64 {
            assert!(collected.contains(&k));
        }

        let capacity = table.capacity();
        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained.len(), 10);
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), capacity);

        for k in 10..20u64 {
            let hash = hash_key(&state, k);
            assert!(table.find(hash, |v| v.key == k).is_none());
        }
        assert_invariants(&table);
    }

    #[test]
    fn iter_order_is_bucket_then_newest_first() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        insert_item(&mut table, 2, 0, 0);
        insert_item(&mut table, 1, 1, 0);
        insert_item(&mut table, 9, 2, 0);
        insert_item(&mut table, 17, 3, 0);

        let keys: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(keys, [3, 2, 1, 0]);
    }

    #[test]
    fn iter_restarts_from_clone() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..4u64 {
            insert_item(&mut table, k, k, 0);
        }
        let iter = table.iter();
        let first: Vec<u64> = iter.clone().map(|v| v.key).collect();
        let second: Vec<u64> = iter.map(|v| v.key).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn partial_drain_still_empties() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..5u64 {
            insert_item(&mut table, k, k, 0);
        }

        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert_eq!(table.slots.len(), 0);
        assert_invariants(&table);

        insert_item(&mut table, 3, 3, 3);
        assert_eq!(table.find(3, |v| v.key == 3).unwrap().value, 3);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..10u64 {
            insert_item(&mut table, k, k, 0);
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);
        assert!(table.find(1, |v| v.key == 1).is_none());
        assert_invariants(&table);
    }

    #[test]
    fn clone_is_independent() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..3u64 {
            insert_item(&mut table, 0, k, k as i32);
        }

        let mut copy = table.clone();
        copy.find_mut(0, |v| v.key == 1).unwrap().value = 100;
        copy.remove(0, |v| v.key == 2).unwrap();
        insert_item(&mut copy, 7, 7, 7);

        assert_eq!(table.len(), 3);
        assert_eq!(table.find(0, |v| v.key == 1).unwrap().value, 1);
        assert!(table.find(0, |v| v.key == 2).is_some());
        assert!(table.find(7, |v| v.key == 7).is_none());
        assert_invariants(&table);
        assert_invariants(&copy);
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct StringItem {
        key: String,
        value: i32,
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    #[test]
    fn insert_and_find_string_keys() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::with_capacity(2).unwrap();
        let keys = ["hello", "world", "foo", "bar", "baz"];

        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            match table.entry(hash, |v: &StringItem| v.key == *k) {
                Entry::Vacant(v) => {
                    v.insert(StringItem {
                        key: k.to_string(),
                        value: i as i32,
                    });
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert"),
            }
        }

        assert_eq!(table.len(), keys.len());

        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == *k),
                Some(&StringItem {
                    key: k.to_string(),
                    value: i as i32
                })
            );
        }

        let miss_hash = hash_string_key(&state, "not found");
        assert!(table.find(miss_hash, |v| v.key == "not found").is_none());
    }

    #[test]
    fn occupied_entry_remove() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::with_capacity(8).unwrap();
        let keys = ["a", "b", "c", "d", "e"];
        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            table.entry(hash, |v| v.key == *k).or_insert(StringItem {
                key: k.to_string(),
                value: i as i32,
            });
        }

        let hash_c = hash_string_key(&state, "c");
        let removed = match table.entry(hash_c, |v| v.key == "c") {
            Entry::Occupied(entry) => entry.remove(),
            Entry::Vacant(_) => unreachable!("Entry should be occupied: {:#?}", table),
        };
        assert_eq!(removed.value, 2);
        assert_eq!(table.len(), 4);
        assert!(table.find(hash_c, |v| v.key == "c").is_none());
        assert!(
            table
                .find(hash_string_key(&state, "a"), |v| v.key == "a")
                .is_some()
        );
        assert_invariants(&table);
    }

    #[test]
    fn entry_or_insert_with() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::with_capacity(8).unwrap();
        let key = "unique_key";
        let hash = hash_string_key(&state, key);

        let value_ref = table
            .entry(hash, |v| v.key == key)
            .or_insert_with(|| StringItem {
                key: key.to_string(),
                value: 42,
            });
        assert_eq!(value_ref.value, 42);

        let existing_ref = table
            .entry(hash, |v| v.key == key)
            .or_insert_with(|| StringItem {
                key: key.to_string(),
                value: 100,
            });
        assert_eq!(existing_ref.value, 42);

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_or_default() {
        let mut table: HashTable<(u64, Vec<u64>)> = HashTable::with_capacity(8).unwrap();
        table.entry(1, |v| v.0 == 0).or_default().1.push(42);
        table.entry(1, |v| v.0 == 0).or_default().1.push(24);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(1, |v| v.0 == 0).unwrap().1, [42, 24]);
    }

    #[test]
    fn vacant_insert_survives_growth() {
        let mut table: HashTable<u64> = HashTable::with_capacity(4).unwrap();
        for n in 0..2u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        // The third insert reaches the threshold of 3 and grows the table
        // before the reference is handed back.
        let value = table.entry(2, |&v| v == 2).or_insert(2);
        *value = 20;
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.find(2, |&v| v == 20), Some(&20));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn entry_into_mut() {
        let state = HashState::default();
        let mut table = HashTable::with_capacity(10).unwrap();
        let hash = hash_string_key(&state, "key");
        table
            .entry(hash, |s: &String| s == "key")
            .or_insert("key".to_string());

        let value_ref = match table.entry(hash, |s: &String| s == "key") {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(_) => unreachable!("Entry should be occupied: {:#?}", table),
        };
        value_ref.push_str("_new");
        assert_eq!(table.find(hash, |s| s == "key_new"), Some(&"key_new".to_string()));
    }

    #[test]
    fn debug_does_not_require_debug_values() {
        struct Opaque;
        let mut table: HashTable<Opaque> = HashTable::with_capacity(4).unwrap();
        table.entry(1, |_| false).or_insert(Opaque);
        table.entry(5, |_| false).or_insert(Opaque);

        let rendered = format!("{:?}", table);
        assert!(rendered.contains("chains: [(1, [1, 0])]"), "{rendered}");
        assert!(rendered.contains("populated: 2"), "{rendered}");
    }

    #[test]
    fn histogram_counts_chain_lengths() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 8, 1, 0);
        insert_item(&mut table, 3, 2, 0);

        let hist = table.chain_histogram();
        assert_eq!(hist.len(), MAX_TRACKED_CHAIN + 1);
        assert_eq!(hist[0], 6);
        assert_eq!(hist[1], 1);
        assert_eq!(hist[2], 1);
        assert_eq!(hist.iter().sum::<usize>(), table.capacity());

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 3);
        assert_eq!(stats.occupied_buckets, 2);
        assert_eq!(stats.longest_chain, 2);
        assert_eq!(stats.free_slots, 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[cfg(feature = "std")]
    fn histogram_output() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(1024).unwrap();
        for k in 0..700u64 {
            insert_item(&mut table, hash_key(&state, k), k, 0);
        }
        table.print_chain_histogram();
        table.debug_stats().print();
        assert_eq!(table.chain_histogram().iter().sum::<usize>(), table.capacity());
    }
}
