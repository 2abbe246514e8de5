use std::mem::MaybeUninit;
use ringbuf::LocalRb;

pub struct FixedRb<T, const N: usize> {
    storage: LocalRb<T, [MaybeUninit<T>; N]>
}

pub fn make_fixed_rb<T, const N: usize>() -> FixedRb<T, N> {
    FixedRb {
        storage: unsafe {
            LocalRb::from_raw_parts(
                MaybeUninit::uninit().assume_init(),
                0,
                0
            )
        }
    }
}

impl<T, const N: usize> FixedRb<T, N> {
    pub fn new() -> Self {
        make_fixed_rb()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.storage.split_ref().1.pop()
    }
    pub fn push(&mut self, element: T) -> Result<(), T> {
        self.storage.split_ref().0.push(element)
    }
    pub fn is_empty(&mut self) -> bool {
        self.storage.split_ref().1.is_empty()
    }
    pub fn is_full(&mut self) -> bool {
        self.storage.split_ref().0.is_full()
    }
    pub fn len(&mut self) -> usize {
        self.storage.split_ref().1.len()
    }
    pub fn clear(&mut self) -> usize {
        self.storage.split_ref().1.clear()
    }
}

impl<T: Copy, const N: usize> FixedRb<T, N> {
    // Pushes as much of the slice as fits; returns how many elements were taken.
    pub fn push_slice(&mut self, elements: &[T]) -> usize {
        self.storage.split_ref().0.push_slice(elements)
    }
    pub fn pop_slice(&mut self, target: &mut [T]) -> usize {
        self.storage.split_ref().1.pop_slice(target)
    }
}

impl<T, const N: usize> Default for FixedRb<T, N> {
    fn default() -> Self {
        make_fixed_rb()
    }
}

pub type ByteRing<const N: usize> = FixedRb<u8, N>;
