//! Shared synthetic inputs for the benchmarks.

use palette::Srgb;
use patolette::ImageBuf;

/// Deterministic pseudo random `u32`s (xorshift).
struct Rng(u32);

impl Rng {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

/// A deterministic square benchmark image with a bounded number of distinct colors.
pub fn benchmark_image(side: u32) -> ImageBuf<Srgb<u8>> {
    let mut rng = Rng(0x9e37_79b9);
    let pixels = (0..side as usize * side as usize)
        .map(|_| {
            let v = rng.next_u32();
            let [r, g, b] = [v, v >> 8, v >> 16].map(|c| (c & 0xfc) as u8);
            Srgb::new(r, g, b)
        })
        .collect();
    ImageBuf::new(side, side, pixels).unwrap()
}

/// The benchmark image sizes, labeled by side length.
pub fn benchmark_images() -> Vec<(String, ImageBuf<Srgb<u8>>)> {
    [128u32, 512]
        .into_iter()
        .map(|side| (format!("{side}x{side}"), benchmark_image(side)))
        .collect()
}
