use framelabel::mask::{crop_mask, is_void, mask_to_rle, rle_to_mask, subtract_mask, MaskBorders};
use proptest::prelude::*;

mod proptest_helpers;

fn foreground(points: &[f64]) -> usize {
    let Some(borders) = MaskBorders::from_points(points) else {
        return 0;
    };
    let runs = framelabel::mask::points_to_runs(&points[..points.len() - 4]);
    rle_to_mask(&runs, borders.width() as usize, borders.height() as usize)
        .iter()
        .filter(|v| **v == 1)
        .count()
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn rle_decodes_back_to_the_bitmap((w, h, bitmap) in proptest_helpers::arb_bitmap(24, 24)) {
        let rle = mask_to_rle(&bitmap);
        prop_assert_eq!(rle.iter().map(|r| *r as usize).sum::<usize>(), w * h);
        prop_assert_eq!(rle_to_mask(&rle, w, h), bitmap);
    }

    #[test]
    fn rle_runs_alternate_after_the_leading_background((_, _, bitmap) in proptest_helpers::arb_bitmap(24, 24)) {
        let rle = mask_to_rle(&bitmap);
        // only the leading background run may be empty
        prop_assert!(rle.iter().skip(1).all(|r| *r > 0));
    }

    #[test]
    fn crop_keeps_every_foreground_pixel(points in proptest_helpers::arb_mask_points()) {
        let cropped = crop_mask(&points, 64, 64);
        let before = foreground(&points);
        if before == 0 {
            prop_assert!(is_void(&cropped));
        } else {
            prop_assert!(!is_void(&cropped));
            prop_assert_eq!(foreground(&cropped), before);
            prop_assert_eq!(crop_mask(&cropped, 64, 64), cropped);
        }
    }

    #[test]
    fn subtracting_a_mask_from_itself_leaves_nothing(points in proptest_helpers::arb_mask_points()) {
        prop_assert!(is_void(&subtract_mask(&points, &points, 64, 64)));
    }

    #[test]
    fn subtraction_never_adds_pixels(
        target in proptest_helpers::arb_mask_points(),
        cutter in proptest_helpers::arb_mask_points(),
    ) {
        let result = subtract_mask(&target, &cutter, 64, 64);
        prop_assert!(foreground(&result) <= foreground(&target));
    }
}
