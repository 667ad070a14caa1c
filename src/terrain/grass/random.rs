// ============================================
// Random - Детерминированные последовательности
// ============================================

/// Линейный конгруэнтный генератор: одинаковый сид даёт ту же расстановку
#[derive(Clone, Debug)]
pub struct RandomStream {
    initial_seed: u32,
    seed: u32,
}

impl RandomStream {
    pub fn new(seed: i32) -> Self {
        Self {
            initial_seed: seed as u32,
            seed: seed as u32,
        }
    }

    /// Вернуться к начальному сиду
    pub fn reset(&mut self) {
        self.seed = self.initial_seed;
    }

    #[inline]
    fn mutate(&mut self) {
        self.seed = self.seed.wrapping_mul(196314165).wrapping_add(907633515);
    }

    /// Число в диапазоне [0, 1)
    #[inline]
    pub fn fraction(&mut self) -> f32 {
        self.mutate();
        f32::from_bits(0x3F80_0000 | (self.seed >> 9)) - 1.0
    }

    #[inline]
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.fraction()
    }
}

/// Элемент последовательности Хальтона по основанию base
pub fn halton(mut index: u32, base: u32) -> f32 {
    let inv_base = 1.0 / base as f32;
    let mut fraction = inv_base;
    let mut result = 0.0;
    while index > 0 {
        result += (index % base) as f32 * fraction;
        index /= base;
        fraction *= inv_base;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halton_values() {
        assert_eq!(halton(0, 2), 0.0);
        assert_eq!(halton(1, 2), 0.5);
        assert_eq!(halton(2, 2), 0.25);
        assert_eq!(halton(3, 2), 0.75);
        assert!((halton(1, 3) - 1.0 / 3.0).abs() < 1e-6);
        assert!((halton(4, 3) - 4.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_random_stream_repeats_after_reset() {
        let mut stream = RandomStream::new(42);
        let first: Vec<f32> = (0..16).map(|_| stream.fraction()).collect();
        assert!(first.iter().all(|v| (0.0..1.0).contains(v)));
        stream.reset();
        let second: Vec<f32> = (0..16).map(|_| stream.fraction()).collect();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }
}
