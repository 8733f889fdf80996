// Rust lacks the HashMap, HashSet and BTree equivalents of vec!

/// Generates the code to initialize a [HashMap](std::collections::HashMap).
///
/// # Example
/// ```
/// # use std::collections::HashMap;
/// # use lalrgram::hashmap;
/// let days = hashmap![0 => "Monday", 1 => "Tuesday", 2 => "Wednesday"];
/// assert_eq!(days, HashMap::from([(0, "Monday"), (1, "Tuesday"), (2, "Wednesday")]));
/// ```
#[macro_export(local_inner_macros)]
macro_rules! hashmap {
    () => { HashMap::new() };
    ($($key:expr => $value:expr,)+) => { hashmap!($($key => $value),+) };
    ($($key:expr => $value:expr),*) => {
        HashMap::from([ $(($key, $value),)* ])
    };
}

/// Generates the code to initialize a [HashSet](std::collections::HashSet).
#[macro_export(local_inner_macros)]
macro_rules! hashset {
    () => { HashSet::new() };
    ($($key:expr,)+) => { hashset!($($key),+) };
    ($($key:expr),*) => { HashSet::from([ $($key,)* ]) };
}

/// Generates the code to initialize a [BTreeSet](std::collections::BTreeSet).
#[macro_export(local_inner_macros)]
macro_rules! btreeset {
    () => { std::collections::BTreeSet::new() };
    ($($key:expr,)+) => { btreeset!($($key),+) };
    ($($key:expr),*) => { std::collections::BTreeSet::from([ $($key,)* ]) };
}

/// Generates the code to initialize a [BTreeMap](std::collections::BTreeMap).
#[macro_export(local_inner_macros)]
macro_rules! btreemap {
    () => { std::collections::BTreeMap::new() };
    ($($key:expr => $value:expr,)+) => { btreemap!($($key => $value),+) };
    ($($key:expr => $value:expr),*) => {
        std::collections::BTreeMap::from([ $(($key, $value),)* ])
    };
}

/// Casts character / integer literals to `u32` codepoint values.
#[macro_export(local_inner_macros)]
macro_rules! utf8 {
    ( $a:literal ) => { $a as u32 }
}

/// Generates a half-open [Seg](crate::segments::Seg) from one codepoint or an inclusive
/// range of codepoints (characters or integers).
///
/// # Example
/// ```
/// # use lalrgram::{seg, utf8, segments::Seg};
/// assert_eq!(seg!('a'), Seg('a' as u32, 'a' as u32 + 1));
/// assert_eq!(seg!('0'-'9'), Seg('0' as u32, '9' as u32 + 1));
/// ```
#[macro_export(local_inner_macros)]
macro_rules! seg {
    ($a:literal - $b:literal) => { Seg(utf8!($a), utf8!($b) + 1) };
    ($a:literal) => { Seg(utf8!($a), utf8!($a) + 1) };
}

/// Generates a [Segments](crate::segments::Segments) initialization from single characters
/// or inclusive ranges of characters / codepoint literals. `DOT` matches every Unicode
/// scalar value, `~` negates the selection.
///
/// # Example
/// ```
/// # use lalrgram::{seg, utf8, segments, segments::{Segments, Seg}};
/// assert_eq!(segments!('a', '0'-'9'), Segments::from([Seg('a' as u32, 'b' as u32), Seg('0' as u32, ':' as u32)]));
/// assert_eq!(segments!(DOT), Segments::dot());
/// ```
#[macro_export(local_inner_macros)]
macro_rules! segments {
    () => { Segments::empty() };
    (DOT) => { Segments::dot() };
    (~ $($a:literal $(- $b:literal)?),+) => { segments![$($a $(- $b)?),+].not() };
    ($($a:literal $(- $b:literal)?),+) => { Segments::from([$(seg!($a $(- $b)?)),+]) };
    ($($a:literal $(- $b:literal)?,)+) => { segments![$($a $(- $b)?),+] };
}
