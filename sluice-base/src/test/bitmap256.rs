use crate::Bitmap256;

#[test]
fn test_union_intersect_subtract() {
    let mut a = Bitmap256::new();
    let mut b = Bitmap256::new();
    a.set(3, true);
    a.set(9, true);
    b.set(9, true);
    b.set(200, true);

    let mut u = a.clone();
    u.union(&b);
    assert!(u.get(3) && u.get(9) && u.get(200));
    assert_eq!(u.count(), 3);

    let mut i = a.clone();
    i.intersect(&b);
    assert_eq!(i.count(), 1);
    assert!(i.get(9));

    let mut s = a.clone();
    s.subtract(&b);
    assert_eq!(s.count(), 1);
    assert!(s.get(3));
}
