//! Acceptance filter configuration for the CAN controller.
//!
//! These are plain configuration records handed to the bus driver; no
//! matching is done here.

use heapless::Vec;

/// A transceiver message filter mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFilterMask {
    /// Links filters to this mask
    pub number: u8,
    /// e.g. 0x7FF
    pub value: u32,
}

/// A transceiver message filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFilter {
    pub number: u8,
    pub value: u32,
    /// The CAN channel this filter applies to
    pub channel: u8,
    /// The mask this filter is paired with
    pub mask_number: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterError {
    #[error("Tried to add a second mask numbered ({0:?})")]
    DuplicateMask(u8),
    #[error("Filter ({0:?}) refers to mask ({1:?}) which does not exist")]
    UnknownMask(u8, u8),
    #[error("No room for more masks")]
    TooManyMasks,
    #[error("No room for more filters")]
    TooManyFilters,
}

/// Up to `M` masks and `F` filters for one controller
#[derive(Debug, Clone, Default)]
pub struct FilterConfig<const M: usize, const F: usize> {
    masks: Vec<CanFilterMask, M>,
    filters: Vec<CanFilter, F>,
}

impl<const M: usize, const F: usize> FilterConfig<M, F> {
    pub const fn new() -> Self {
        Self {
            masks: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn add_mask(&mut self, mask: CanFilterMask) -> Result<(), FilterError> {
        if self.mask(mask.number).is_some() {
            return Err(FilterError::DuplicateMask(mask.number));
        }

        self.masks.push(mask).map_err(|_| FilterError::TooManyMasks)
    }

    /// Adds a filter. Its mask has to be added first.
    pub fn add_filter(&mut self, filter: CanFilter) -> Result<(), FilterError> {
        if self.mask(filter.mask_number).is_none() {
            return Err(FilterError::UnknownMask(filter.number, filter.mask_number));
        }

        self.filters
            .push(filter)
            .map_err(|_| FilterError::TooManyFilters)
    }

    pub fn mask(&self, number: u8) -> Option<&CanFilterMask> {
        self.masks.iter().find(|mask| mask.number == number)
    }

    pub fn masks(&self) -> &[CanFilterMask] {
        &self.masks
    }

    pub fn filters(&self) -> &[CanFilter] {
        &self.filters
    }

    /// Filters applying to one channel
    pub fn filters_for_channel(&self, channel: u8) -> impl Iterator<Item = &CanFilter> {
        self.filters
            .iter()
            .filter(move |filter| filter.channel == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASK: CanFilterMask = CanFilterMask {
        number: 0,
        value: 0x7FF,
    };

    fn filter(number: u8, channel: u8, mask_number: u8) -> CanFilter {
        CanFilter {
            number,
            value: 0x100 + number as u32,
            channel,
            mask_number,
        }
    }

    #[test]
    fn masks_must_be_unique() {
        let mut config = FilterConfig::<1, 4>::new();

        assert_eq!(config.add_mask(MASK), Ok(()));
        assert_eq!(config.add_mask(MASK), Err(FilterError::DuplicateMask(0)));
        assert_eq!(
            config.add_mask(CanFilterMask { number: 1, value: 0 }),
            Err(FilterError::TooManyMasks)
        );
        assert_eq!(config.mask(0), Some(&MASK));
    }

    #[test]
    fn filters_need_a_mask() {
        let mut config = FilterConfig::<2, 2>::new();

        assert_eq!(
            config.add_filter(filter(0, 0, 0)),
            Err(FilterError::UnknownMask(0, 0))
        );

        config.add_mask(MASK).unwrap();

        assert_eq!(config.add_filter(filter(0, 0, 0)), Ok(()));
        assert_eq!(config.add_filter(filter(1, 1, 0)), Ok(()));
        assert_eq!(
            config.add_filter(filter(2, 1, 0)),
            Err(FilterError::TooManyFilters)
        );

        assert_eq!(config.filters().len(), 2);
        assert_eq!(
            config
                .filters_for_channel(1)
                .map(|filter| filter.number)
                .collect::<Vec<u8, 2>>()
                .as_slice(),
            &[1]
        );
    }
}
