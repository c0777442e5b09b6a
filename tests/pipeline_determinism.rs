//! Pipeline output must not depend on channel scheduling.

use raincast::{ChannelPipeline, FarnebackFlow, ParameterSet, PersistenceFlow, Plane, RasterImage};

fn textured_plane(width: usize, height: usize, salt: usize) -> Plane {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11) ^ (y * 3) ^ (x * y) ^ salt) & 0xFF;
            data.push(value as u8);
        }
    }
    Plane::new(data, width, height).unwrap()
}

fn textured_image(width: usize, height: usize, salt: usize) -> RasterImage {
    let planes = (0..3).map(|c| textured_plane(width, height, salt + c * 97)).collect();
    RasterImage::from_planes(planes).unwrap()
}

#[test]
fn zero_displacement_composite_is_identity_with_full_validity() {
    // Every pixel carries colour, so the validity plane must saturate.
    let planes = (0..3)
        .map(|c| {
            let data = (0..24 * 16)
                .map(|i| (1 + (i + c * 31) % 255) as u8)
                .collect();
            Plane::new(data, 24, 16).unwrap()
        })
        .collect::<Vec<_>>();
    let img = RasterImage::from_planes(planes).unwrap();

    let out = ChannelPipeline::default()
        .evaluate(&img, &img, &PersistenceFlow::new())
        .unwrap();

    for chnl in 0..3 {
        assert_eq!(out.channel(chnl).unwrap(), img.channel(chnl).unwrap());
    }
    assert!(out.channel(3).unwrap().data().iter().all(|&v| v == 255));
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_matches_sequential_bit_for_bit() {
    let prev = textured_image(48, 40, 5);
    let curr = textured_image(48, 40, 17);
    let algo = FarnebackFlow::new(ParameterSet {
        scale: 0.5,
        levels: 2,
        smoothing: 10,
        iterations: 2,
        poly_area: 5,
        poly_width: 1.2,
    });

    let seq = ChannelPipeline::sequential()
        .evaluate(&prev, &curr, &algo)
        .unwrap();
    let par = ChannelPipeline::default()
        .evaluate(&prev, &curr, &algo)
        .unwrap();

    assert_eq!(seq.channel_count(), par.channel_count());
    for chnl in 0..seq.channel_count() {
        assert_eq!(
            seq.channel(chnl).unwrap(),
            par.channel(chnl).unwrap(),
            "channel {chnl} differs between sequential and parallel runs"
        );
    }
}

#[cfg(feature = "rayon")]
#[test]
fn repeated_parallel_runs_are_reproducible() {
    let prev = textured_image(32, 32, 1);
    let curr = textured_image(32, 32, 2);
    let algo = PersistenceFlow::new();
    let pipeline = ChannelPipeline::default();

    let first = pipeline.evaluate(&prev, &curr, &algo).unwrap();
    for _ in 0..4 {
        let again = pipeline.evaluate(&prev, &curr, &algo).unwrap();
        assert_eq!(first, again);
    }
}
