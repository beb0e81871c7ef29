use crate::error::{Error, Result};
use crate::{PAGE_SIZE_BITS, VIRTUAL_ADDRESS_BITS};

/// Virtual page number: a virtual address with the page offset bits removed.
pub type Vpn = u32;

const MASK_OFFSET: u32 = (1 << PAGE_SIZE_BITS) - 1;

/// `VirtualAddress` is a type that represents the components of a virtual memory address in a
/// single structure: the index into the first level table, the index into the second level table
/// and the offset within the page.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct VirtualAddress {
    pub first_index: usize,
    pub second_index: usize,
    pub offset: u32,
}

/// `AddressLayout` describes how a 32-bit virtual address is split for a two-level page table.
/// The page offset width is fixed; the first level width is configured once at startup and the
/// second level receives whatever bits remain.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct AddressLayout {
    first_level_bits: u32,
}

impl AddressLayout {
    /// Create a new layout with the provided first level width.
    ///
    /// # Arguments
    ///
    /// * `first_level_bits` - number of high address bits used to index the first level table.
    ///
    /// # Errors
    ///
    /// Returns `Error::FirstLevelTooWide` when the first level and the page offset together leave
    /// no bit for the second level.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_table_sim::address::AddressLayout;
    /// let layout = AddressLayout::new(10).unwrap();
    /// assert_eq!(layout.second_level_bits(), 10);
    /// assert!(AddressLayout::new(20).is_err());
    /// ```
    pub fn new(first_level_bits: u32) -> Result<Self> {
        if first_level_bits >= VIRTUAL_ADDRESS_BITS - PAGE_SIZE_BITS {
            return Err(Error::FirstLevelTooWide(first_level_bits));
        }
        Ok(Self { first_level_bits })
    }

    pub fn first_level_bits(&self) -> u32 {
        self.first_level_bits
    }

    pub fn second_level_bits(&self) -> u32 {
        VIRTUAL_ADDRESS_BITS - self.first_level_bits - PAGE_SIZE_BITS
    }

    pub fn first_level_entries(&self) -> usize {
        1 << self.first_level_bits
    }

    pub fn second_level_entries(&self) -> usize {
        1 << self.second_level_bits()
    }

    /// Provided an address in the form of a 32-bit unsigned integer, split said address into its
    /// first level index, second level index and page offset.
    ///
    /// # Arguments
    ///
    /// * `address` - 32-bit unsigned integer representing a virtual address location
    ///
    /// # Examples
    ///
    /// ```
    /// use page_table_sim::address::AddressLayout;
    /// let layout = AddressLayout::new(8).unwrap();
    /// let address = layout.decompose(0xab_cde_123);
    /// assert_eq!(address.first_index, 0xab);
    /// assert_eq!(address.second_index, 0xcde);
    /// assert_eq!(address.offset, 0x123);
    /// ```
    pub fn decompose(&self, address: u32) -> VirtualAddress {
        // widened so that a zero-width first level shifts the whole address out
        let first_shift = PAGE_SIZE_BITS + self.second_level_bits();
        let first_index = (u64::from(address) >> first_shift) as usize;
        let second_mask = (1u32 << self.second_level_bits()) - 1;
        VirtualAddress {
            first_index,
            second_index: ((address >> PAGE_SIZE_BITS) & second_mask) as usize,
            offset: page_offset(address),
        }
    }

    /// Split the first address of a virtual page, used to locate the table entry that maps it.
    pub fn decompose_vpn(&self, vpn: Vpn) -> VirtualAddress {
        self.decompose(vpn << PAGE_SIZE_BITS)
    }
}

pub fn vpn(address: u32) -> Vpn {
    address >> PAGE_SIZE_BITS
}

pub fn page_offset(address: u32) -> u32 {
    address & MASK_OFFSET
}

/// Concatenate a frame number with the page offset of the original virtual address.
pub fn physical_address(frame: usize, address: u32) -> u64 {
    ((frame as u64) << PAGE_SIZE_BITS) | u64::from(page_offset(address))
}
