use anyhow::Result;
use rindex::geometry::Box2;
use rindex::rtree::RTree;

fn main() -> Result<()> {
    println!("--- RTree Example ---");
    let mut tree = RTree::new();

    // Index a few boxes under caller-chosen ids
    tree.insert(Box2::from_corners(0.0, 0.0, 10.0, 10.0)?, 1)?;
    tree.insert(Box2::from_corners(20.0, 20.0, 30.0, 30.0)?, 2)?;
    tree.insert(Box2::from_corners(5.0, 5.0, 25.0, 25.0)?, 3)?;

    // Window query: every id whose box overlaps the window
    let window = Box2::from_corners(8.0, 8.0, 22.0, 22.0)?;
    let mut hits = tree.query_range(&window);
    hits.sort_unstable();
    println!("Ids overlapping {:?}: {:?}", window, hits);

    // Move id 1 away and query again
    tree.update(1, Box2::from_corners(100.0, 100.0, 110.0, 110.0)?)?;
    let mut hits = tree.query_range(&window);
    hits.sort_unstable();
    println!("After moving id 1: {:?}", hits);

    // Erase id 2; the tree reports the ids that remain
    tree.erase(2)?;
    let everything = Box2::from_corners(0.0, 0.0, 200.0, 200.0)?;
    let mut hits = tree.query_range(&everything);
    hits.sort_unstable();
    println!("All remaining ids: {:?} (len = {})", hits, tree.len());

    // Erasing an unknown id is reported as an error
    match tree.erase(2) {
        Ok(()) => println!("unexpected"),
        Err(err) => println!("Erasing id 2 again: {err}"),
    }

    Ok(())
}
