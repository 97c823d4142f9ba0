mod inspect_test;
