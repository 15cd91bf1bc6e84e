use lazylist::{LazyList, Verdict};
use std::cell::Cell;
use std::rc::Rc;

fn naturals() -> LazyList<u64> {
    LazyList::count_from(1)
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_odds_from_naturals() {
    let odds = naturals().select(|x| x % 2 == 1);
    assert_eq!(odds.range(0..=2), Some(vec![1, 3, 5]));
    assert_eq!(odds.get(499), Some(999));
}

#[test]
fn test_select_never_calls_predicate_twice_per_element() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let multiples = naturals().select(move |x| {
        counter.set(counter.get() + 1);
        x % 10 == 0
    });
    assert_eq!(multiples.take(3), vec![10, 20, 30]);
    assert_eq!(multiples.take(3), vec![10, 20, 30]);
    assert_eq!(calls.get(), 30);
}

#[test]
fn test_stop_is_not_an_error() {
    let below_five = naturals().select(|&x| if x < 5 { Verdict::Keep } else { Verdict::Stop });
    assert_eq!(below_five.len(), 4);
    let (small, _) = naturals().partition(|&x| x < 3);
    assert_eq!(small.take(2), vec![1, 2]);
}

#[test]
#[should_panic(expected = "predicate exploded")]
fn test_predicate_panics_propagate() {
    let l = naturals().select(|&x| {
        if x == 3 {
            panic!("predicate exploded");
        }
        true
    });
    l.take(5);
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_evens_and_odds_gives_naturals() {
    let evens = naturals().select(|x| x % 2 == 0);
    let odds = naturals().select(|x| x % 2 == 1);
    let merged = evens.merge(&odds);
    assert_eq!(merged.range(0..=9), naturals().range(0..=9));
    assert_eq!(merged.take(10), (1..=10).collect::<Vec<u64>>());
}

#[test]
fn test_merge_of_overlapping_multiples_dedups() {
    let twos = naturals().map(|x| x * 2);
    let threes = naturals().map(|x| x * 3);
    assert_eq!(twos.merge(&threes).take(8), vec![2, 3, 4, 6, 8, 9, 10, 12]);
}

// ============================================================================
// Map, zip, append
// ============================================================================

#[test]
fn test_map_preserves_length() {
    let words = LazyList::from(vec!["a", "bb", "ccc"]);
    let lengths = words.map(str::len);
    assert_eq!(lengths.len(), words.len());
    assert_eq!(lengths.get(2), Some(3));
}

#[test]
fn test_zip_heterogeneous() {
    let labelled = LazyList::from(vec!['x', 'y', 'z']).zip(&naturals());
    assert_eq!(labelled.to_vec(), vec![('x', 1), ('y', 2), ('z', 3)]);
    let sums = naturals().zip_with(&naturals().drop(1), |a, b| a + b);
    assert_eq!(sums.take(3), vec![3, 5, 7]);
}

#[test]
fn test_zip_all_with_combiner() {
    let rows = LazyList::zip_all_with(
        vec![naturals(), naturals().map(|x| x * 10), LazyList::from(vec![100, 200])],
        |row: Vec<u64>| row.iter().sum::<u64>(),
    );
    assert_eq!(rows.to_vec(), vec![111, 222]);
}

#[test]
fn test_concat_is_lazy_in_later_lists() {
    let touched = Rc::new(Cell::new(false));
    let flag = Rc::clone(&touched);
    let later = LazyList::delay(move || {
        flag.set(true);
        LazyList::from(vec![9])
    });
    let l = LazyList::from(vec![1, 2]).append(&later);
    assert_eq!(l.take(2), vec![1, 2]);
    assert!(!touched.get());
    assert_eq!(l.to_vec(), vec![1, 2, 9]);
    assert!(touched.get());
}

#[test]
fn test_enumerate() {
    let tagged = LazyList::from(vec!["zero", "one"]).enumerate();
    assert_eq!(tagged.to_vec(), vec![("zero", 0), ("one", 1)]);
}

// ============================================================================
// Fair enumeration
// ============================================================================

#[test]
fn test_mix_of_infinite_lists_visits_all() {
    let mixed = LazyList::mix(vec![
        naturals().map(|x| x * 2),
        naturals().map(|x| x * 2 + 1),
        LazyList::from(vec![0]),
    ]);
    assert_eq!(mixed.take(7), vec![2, 3, 0, 4, 5, 6, 7]);
}

#[test]
fn test_product_of_infinite_lists_reaches_off_diagonal_pairs() {
    let n = LazyList::count_from(0u32);
    let pairs = n.product(&n);
    let position = |target: (u32, u32)| pairs.iter().take(5000).position(|p| p == target);
    assert_eq!(position((0, 0)), Some(0));
    assert!(position((7, 13)).is_some());
    assert!(position((13, 7)).is_some());
}

#[test]
fn test_finite_product_covers_cross_set_once() {
    let left = LazyList::from(0..4);
    let right = LazyList::from(vec!['a', 'b', 'c']);
    let mut pairs = left.product(&right).to_vec();
    assert_eq!(pairs.len(), 12);
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), 12);
}

#[test]
fn test_product_with_combiner() {
    let sums = LazyList::from(vec![10, 20]).product_with(&LazyList::from(vec![1, 2]), |a, b| a + b);
    assert_eq!(sums.to_vec(), vec![11, 12, 21, 22]);
}

#[test]
fn test_cartesian_product_with_infinite_member() {
    let triples = LazyList::from(vec![0u32, 1]).cartesian_product(&[naturals().map(|x| x as u32), LazyList::from(vec![5, 6])]);
    let first: Vec<Vec<u32>> = triples.take(200);
    assert!(first.contains(&vec![1, 10, 6]));
    assert!(first.iter().all(|t| t.len() == 3));
}

#[test]
fn test_sorted_is_finite_only_and_lazy() {
    let l = LazyList::from(vec![3, 1, 2]);
    let sorted = l.sorted();
    assert_eq!(format!("{sorted:?}"), "[... ]");
    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);
    assert_eq!(l.to_vec(), vec![3, 1, 2]);
}
