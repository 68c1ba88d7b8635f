//! Packing map sections onto virtual pages.
//!
//! Starts with one section per page and repeatedly merges adjacent pages,
//! side by side or stacked, keeping whichever fits and lands closer to the
//! target aspect ratio. Pure integer geometry.

use serde::{Deserialize, Serialize};

use crate::world::{SectionId, World};

/// A packed virtual page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub num: usize,
    /// Content width in grid cells.
    pub xlen: i32,
    /// Content height in grid cells.
    pub ylen: i32,
    /// Whether renderers should rotate the page a quarter turn.
    pub rotate: bool,
    /// Sections on this page with their offsets.
    pub placements: Vec<Placement>,
}

/// One section's position on its page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub section: SectionId,
    pub xoff: i32,
    pub yoff: i32,
}

/// Pack every section onto pages at most `xmax` by `ymax` cells.
pub fn pack_pages(world: &World, xmax: i32, ymax: i32) -> Vec<Page> {
    let spacing = world.vars.map_section_spacing as i32;
    let specs: Vec<(SectionId, i32, i32)> = world
        .sections
        .iter()
        .map(|s| (s.id, s.xlen, s.ylen))
        .collect();
    pack(&specs, xmax, ymax, spacing)
}

struct Build {
    xlen: i32,
    ylen: i32,
    rotate: bool,
    placements: Vec<Placement>,
}

fn pack(specs: &[(SectionId, i32, i32)], xmax: i32, ymax: i32, spacing: i32) -> Vec<Page> {
    let mut pages: Vec<Build> = specs
        .iter()
        .map(|&(section, xlen, ylen)| Build {
            xlen,
            ylen,
            rotate: false,
            placements: vec![Placement {
                section,
                xoff: 0,
                yoff: 0,
            }],
        })
        .collect();

    let ratio = f64::from(xmax) / f64::from(ymax);

    loop {
        let mut packed = 0;
        let mut newpages: Vec<Build> = Vec::new();
        let mut pos = 0;

        while pos < pages.len() {
            let (x1, y1) = (pages[pos].xlen, pages[pos].ylen);
            pages[pos].rotate = (x1 < y1 && xmax > ymax) || (x1 > y1 && xmax < ymax);

            if pos + 1 == pages.len() {
                if let Some(last) = pages.pop() {
                    newpages.push(last);
                }
                break;
            }

            let (x2, y2) = (pages[pos + 1].xlen, pages[pos + 1].ylen);

            // Side by side.
            let xc1 = x1 + x2 + spacing;
            let yc1 = y1.max(y2);
            let mut v1 = xc1 <= xmax && yc1 <= ymax;
            let r1 = f64::from(xc1) / f64::from(yc1);

            // Stacked.
            let xc2 = x1.max(x2);
            let yc2 = y1 + y2 + spacing;
            let mut v2 = xc2 <= xmax && yc2 <= ymax;
            let r2 = f64::from(xc2) / f64::from(yc2);

            // Both fit: keep the one closer to the target ratio, and a
            // dead heat goes to stacking.
            if v1 && v2 {
                if (ratio - r1).abs() < (ratio - r2).abs() {
                    v2 = false;
                } else {
                    v1 = false;
                }
            }

            if !v1 && !v2 {
                let page = pages.remove(pos);
                newpages.push(page);
                continue;
            }

            let p2 = pages.remove(pos + 1);
            let p1 = pages.remove(pos);

            let (xlen, ylen);
            let (mut xo1, mut yo1, mut xo2, mut yo2) = (0, 0, 0, 0);
            if v1 {
                xlen = xc1;
                ylen = yc1;
                xo2 = x1 + spacing;
                if y1 < y2 {
                    yo1 = (yc1 - y1) / 2;
                } else {
                    yo2 = (yc1 - y2) / 2;
                }
            } else {
                xlen = xc2;
                ylen = yc2;
                yo1 = y2 + spacing;
                if x1 < x2 {
                    xo1 = (xc2 - x1) / 2;
                } else {
                    xo2 = (xc2 - x2) / 2;
                }
            }

            let mut placements = Vec::with_capacity(p1.placements.len() + p2.placements.len());
            for p in p1.placements {
                placements.push(Placement {
                    section: p.section,
                    xoff: p.xoff + xo1,
                    yoff: p.yoff + yo1,
                });
            }
            for p in p2.placements {
                placements.push(Placement {
                    section: p.section,
                    xoff: p.xoff + xo2,
                    yoff: p.yoff + yo2,
                });
            }

            newpages.push(Build {
                xlen,
                ylen,
                rotate: false,
                placements,
            });
            packed += 1;
        }

        pages = newpages;
        if packed == 0 {
            break;
        }
    }

    pages
        .into_iter()
        .enumerate()
        .map(|(i, b)| Page {
            num: i + 1,
            xlen: b.xlen,
            ylen: b.ylen,
            rotate: b.rotate,
            placements: b.placements,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(dims: &[(i32, i32)]) -> Vec<(SectionId, i32, i32)> {
        dims.iter()
            .enumerate()
            .map(|(i, &(x, y))| (SectionId(i), x, y))
            .collect()
    }

    #[test]
    fn single_section_fills_one_page() {
        let pages = pack(&sections(&[(4, 3)]), 10, 10, 1);
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].xlen, pages[0].ylen), (4, 3));
        assert_eq!(pages[0].placements.len(), 1);
    }

    #[test]
    fn two_small_sections_share_a_page() {
        let pages = pack(&sections(&[(3, 3), (3, 3)]), 10, 10, 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].placements.len(), 2);
    }

    #[test]
    fn oversized_sections_stay_apart() {
        let pages = pack(&sections(&[(8, 8), (8, 8)]), 10, 10, 1);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].num, 1);
        assert_eq!(pages[1].num, 2);
    }

    #[test]
    fn tie_prefers_stacked() {
        // 2x2 pages on a 5x4 target: side by side gives ratio 2, stacked
        // gives 0.5, both exactly 0.75 from the target's 1.25. The dead
        // heat must go to stacking.
        let pages = pack(&sections(&[(2, 2), (2, 2)]), 5, 4, 0);
        assert_eq!(pages.len(), 1);
        let p = &pages[0];
        assert_eq!((p.xlen, p.ylen), (2, 4));
        // Stacking puts the first section above the second.
        assert_eq!((p.placements[0].xoff, p.placements[0].yoff), (0, 2));
        assert_eq!((p.placements[1].xoff, p.placements[1].yoff), (0, 0));
    }

    #[test]
    fn narrow_page_rotates_wide_sections() {
        let pages = pack(&sections(&[(8, 2)]), 4, 10, 1);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].rotate);
    }
}
