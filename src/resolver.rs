//! Mapping addresses to code accessors.

use alloy_primitives::Address;
use std::{borrow::Cow, ops::RangeInclusive};

use crate::{error::Result, AddressPoint, ContractCode, FlatCode, TreeCode, TreeReader};

/// Hands out a [`ContractCode`] accessor for an address.
pub trait CodeResolver {
    /// Accessor returned by [`resolve`](Self::resolve).
    type Code<'a>: ContractCode
    where
        Self: 'a;

    /// Get the code accessor of `address`.
    fn resolve(&self, address: Address) -> Self::Code<'_>;
}

/// Resolves every address to the same flat code.
///
/// Used when a single transaction only ever runs one contract, e.g. in simulation.
#[derive(Clone, Debug)]
pub struct SingleCodeResolver {
    code: FlatCode,
}

impl SingleCodeResolver {
    /// Serve `code` of `address` for any address, readable within `allowed_ranges`.
    pub fn new(
        code: impl Into<alloy_primitives::Bytes>,
        address: Address,
        allowed_ranges: Vec<RangeInclusive<u64>>,
    ) -> Self {
        Self { code: FlatCode::new(address, code, allowed_ranges) }
    }
}

impl From<FlatCode> for SingleCodeResolver {
    fn from(code: FlatCode) -> Self {
        Self { code }
    }
}

impl CodeResolver for SingleCodeResolver {
    type Code<'a> = &'a FlatCode;

    fn resolve(&self, address: Address) -> &FlatCode {
        trace!(%address, code_address = %self.code.address(), "resolve flat code");
        &self.code
    }
}

/// Resolves addresses to code chunked in a shared tree.
#[derive(Clone, Debug)]
pub struct TreeCodeResolver<T> {
    tree: T,
}

impl<T: TreeReader> TreeCodeResolver<T> {
    /// Read code out of `tree`.
    pub const fn new(tree: T) -> Self {
        Self { tree }
    }

    /// The tree code is read from.
    pub const fn tree(&self) -> &T {
        &self.tree
    }
}

impl<T: TreeReader> CodeResolver for TreeCodeResolver<T> {
    type Code<'a> = TreeCode<'a, T> where Self: 'a;

    fn resolve(&self, address: Address) -> TreeCode<'_, T> {
        trace!(%address, "resolve tree code");
        TreeCode::new(AddressPoint::new(address), &self.tree)
    }
}

/// The code storage backend in use, flat or chunked.
#[derive(Clone, Debug)]
pub enum CodeBackend<T> {
    /// One flat code buffer for every address.
    Single(SingleCodeResolver),
    /// Chunked code in a tree.
    Tree(TreeCodeResolver<T>),
}

impl<T: TreeReader> CodeResolver for CodeBackend<T> {
    type Code<'a> = CodeAccessor<'a, T> where Self: 'a;

    fn resolve(&self, address: Address) -> CodeAccessor<'_, T> {
        match self {
            Self::Single(resolver) => CodeAccessor::Flat(resolver.resolve(address)),
            Self::Tree(resolver) => CodeAccessor::Tree(resolver.resolve(address)),
        }
    }
}

/// Accessor handed out by [`CodeBackend`].
#[derive(Debug)]
pub enum CodeAccessor<'a, T: ?Sized> {
    /// Code held in one contiguous buffer.
    Flat(&'a FlatCode),
    /// Code read chunk by chunk from a tree.
    Tree(TreeCode<'a, T>),
}

impl<T: TreeReader + ?Sized> ContractCode for CodeAccessor<'_, T> {
    fn get_byte(&self, pos: u64) -> Result<u8> {
        match self {
            Self::Flat(code) => code.get_byte(pos),
            Self::Tree(code) => code.get_byte(pos),
        }
    }

    fn get_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Flat(code) => code.get_range(start, end),
            Self::Tree(code) => code.get_range(start, end),
        }
    }

    fn get_all(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Flat(code) => code.get_all(),
            Self::Tree(code) => code.get_all(),
        }
    }

    fn size(&self) -> Result<u64> {
        match self {
            Self::Flat(code) => code.size(),
            Self::Tree(code) => code.size(),
        }
    }
}
