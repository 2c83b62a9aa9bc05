use super::*;

#[test]
fn take_from_transfers_membership() {
    let _trace = trace_init();

    let x = entry(1);
    let a = entry(2);
    let y = entry(3);
    let b = entry(20);
    let list = new_list();
    let list = list.as_ref();
    list.push_back(x.as_ref());
    list.push_back(a.as_ref());
    list.push_back(y.as_ref());

    links(&b).take_from(links(&a));
    list.assert_valid();
    assert_idle!(a);
    assert_eq!(collect_vals(list), [1, 20, 3]);

    // `b` is linked between `x` and `y`.
    assert_eq!(x.links.next_ptr(), NonNull::from(&b.links));
    assert_eq!(y.links.prev_ptr(), NonNull::from(&b.links));
    assert_eq!(b.links.prev_ptr(), NonNull::from(&x.links));
    assert_eq!(b.links.next_ptr(), NonNull::from(&y.links));
}

#[test]
fn take_from_idle_leaves_both_idle() {
    let a = entry(1);
    let b = entry(2);
    links(&b).take_from(links(&a));
    assert_idle!(a);
    assert_idle!(b);
}

#[test]
fn take_from_unlinks_destination_first() {
    let entries = [entry(1), entry(2)];
    let others = [entry(10), entry(20)];
    let list1 = new_list();
    let list1 = list1.as_ref();
    let list2 = new_list();
    let list2 = list2.as_ref();
    push_all(list1, &entries);
    push_all(list2, &others);

    links(&entries[0]).take_from(links(&others[1]));
    list1.assert_valid();
    list2.assert_valid();
    assert_idle!(others[1]);
    assert_eq!(collect_vals(list1), [2]);
    assert_eq!(collect_vals(list2), [10, 1]);

    // Moving from an idle node leaves the destination idle too.
    links(&entries[0]).take_from(links(&others[1]));
    assert_idle!(entries[0]);
    assert_eq!(collect_vals(list2), [10]);
}

#[test]
fn take_from_self_is_a_noop() {
    let entries = [entry(1), entry(2)];
    let list = new_list();
    let list = list.as_ref();
    push_all(list, &entries);

    links(&entries[0]).take_from(links(&entries[0]));
    list.assert_valid();
    assert_eq!(collect_vals(list), [1, 2]);
}

#[test]
fn take_from_neighbor() {
    let entries = [entry(1), entry(2), entry(3)];
    let list = new_list();
    let list = list.as_ref();
    push_all(list, &entries);

    links(&entries[0]).take_from(links(&entries[1]));
    list.assert_valid();
    assert_idle!(entries[1]);
    assert_eq!(collect_vals(list), [1, 3]);
}

#[test]
fn swap_across_lists() {
    let _trace = trace_init();

    let entries = [entry(1), entry(2), entry(3)];
    let others = [entry(10), entry(20)];
    let list1 = new_list();
    let list1 = list1.as_ref();
    let list2 = new_list();
    let list2 = list2.as_ref();
    push_all(list1, &entries);
    push_all(list2, &others);

    links(&entries[1]).swap(links(&others[0]));
    list1.assert_valid();
    list2.assert_valid();
    assert_eq!(collect_vals(list1), [1, 10, 3]);
    assert_eq!(collect_vals(list2), [2, 20]);
}

#[test]
fn swap_adjacent() {
    let entries = [entry(1), entry(2), entry(3), entry(4)];
    let list = new_list();
    let list = list.as_ref();
    push_all(list, &entries);

    links(&entries[1]).swap(links(&entries[2]));
    list.assert_valid();
    assert_eq!(collect_vals(list), [1, 3, 2, 4]);

    // And in the other direction.
    links(&entries[1]).swap(links(&entries[2]));
    list.assert_valid();
    assert_eq!(collect_vals(list), [1, 2, 3, 4]);

    links(&entries[3]).swap(links(&entries[0]));
    list.assert_valid();
    assert_eq!(collect_vals(list), [4, 2, 3, 1]);
}

#[test]
fn swap_with_idle() {
    let entries = [entry(1), entry(2)];
    let idle = entry(3);
    let list = new_list();
    let list = list.as_ref();
    push_all(list, &entries);

    links(&idle).swap(links(&entries[0]));
    list.assert_valid();
    assert_idle!(entries[0]);
    assert_eq!(collect_vals(list), [3, 2]);

    links(&idle).swap(links(&entries[0]));
    list.assert_valid();
    assert_idle!(idle);
    assert_eq!(collect_vals(list), [1, 2]);
}

/// A list used as a queue keeps its order when moved into another list, and
/// the elements still unlink themselves from the new list when dropped.
#[test]
fn list_take_from() {
    let _trace = trace_init();

    let x = entry(1);
    let y = entry(2);
    let z = entry(3);
    let list1 = new_list();
    let list1 = list1.as_ref();
    list1.push_back(x.as_ref());
    list1.push_back(y.as_ref());
    list1.push_back(z.as_ref());

    let list2 = new_list();
    let list2 = list2.as_ref();
    list2.take_from(list1);

    assert!(list1.is_empty());
    list1.assert_valid();
    list2.assert_valid();
    assert_eq!(collect_vals(list2), [1, 2, 3]);

    drop(y);
    list2.assert_valid();
    assert_eq!(collect_vals(list2), [1, 3]);
}

#[test]
fn list_take_from_replaces_contents() {
    let entries = [entry(1), entry(2)];
    let old = [entry(10), entry(20)];
    let list1 = new_list();
    let list1 = list1.as_ref();
    let list2 = new_list();
    let list2 = list2.as_ref();
    push_all(list1, &entries);
    push_all(list2, &old);

    list2.take_from(list1);
    list1.assert_valid();
    list2.assert_valid();
    assert!(list1.is_empty());
    assert_eq!(collect_vals(list2), [1, 2]);
    assert_idle!(old[0]);
    assert_idle!(old[1]);

    // Taking from an empty list empties the destination.
    list2.take_from(list1);
    assert!(list2.is_empty());
    assert_idle!(entries[0]);
    assert_idle!(entries[1]);
}

#[test]
fn list_swap() {
    let _trace = trace_init();

    let entries = [entry(1), entry(2), entry(3)];
    let others = [entry(10)];
    let list1 = new_list();
    let list1 = list1.as_ref();
    let list2 = new_list();
    let list2 = list2.as_ref();
    push_all(list1, &entries);
    push_all(list2, &others);

    list1.swap(list2);
    list1.assert_valid();
    list2.assert_valid();
    assert_eq!(collect_vals(list1), [10]);
    assert_eq!(collect_vals(list2), [1, 2, 3]);

    let empty = new_list();
    let empty = empty.as_ref();
    list2.swap(empty);
    list2.assert_valid();
    empty.assert_valid();
    assert!(list2.is_empty());
    assert_eq!(collect_vals(empty), [1, 2, 3]);

    list1.swap(list1);
    assert_eq!(collect_vals(list1), [10]);
}
